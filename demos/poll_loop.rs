// Drives the message thread in fixed time slices instead of blocking in the
// dispatch loop, the way an embedding host with its own frame loop would.
use msgthread::{BridgeError, ManagerBuilder};
use std::env;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

fn main() -> Result<(), BridgeError> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let frame_ms: u64 = args.get(1).and_then(|s| s.parse().ok()).unwrap_or(16);
    let run_secs: u64 = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(2);

    let ticks = Arc::new(AtomicU64::new(0));
    let handled = Arc::clone(&ticks);
    let manager = ManagerBuilder::new().build(move |tick: u64| {
        handled.fetch_max(tick, Ordering::Relaxed);
    })?;

    let stopper = manager.stopper();
    ctrlc::set_handler(move || stopper.stop()).expect("Error setting Ctrl+C handler");

    // Ticker thread posts at ~1kHz until the deadline, then stops the loop
    let queue = manager.message_queue();
    let stopper = manager.stopper();
    let ticker = thread::spawn(move || {
        let deadline = Instant::now() + Duration::from_secs(run_secs);
        let mut tick = 0u64;
        while Instant::now() < deadline && !stopper.is_quit_posted() {
            tick += 1;
            if queue.post(tick).is_err() {
                break;
            }
            thread::sleep(Duration::from_millis(1));
        }
        stopper.stop();
        tick
    });

    let mut frames = 0u64;
    while manager.run_dispatch_loop_until(Duration::from_millis(frame_ms))? {
        frames += 1;
        if frames % 30 == 0 {
            println!(
                "Frame {}: latest tick {}, {} pending",
                frames,
                ticks.load(Ordering::Relaxed),
                manager.pending_messages()
            );
        }
    }

    let posted = ticker.join().unwrap_or(0);
    println!(
        "Quit after {} frames; handled up to tick {} of {}",
        frames,
        ticks.load(Ordering::Relaxed),
        posted
    );

    let report = manager.shutdown()?;
    println!("Shutdown drain {:?}", report);
    Ok(())
}
