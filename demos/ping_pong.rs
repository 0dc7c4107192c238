// Workers post pings and make blocking calls while the main thread runs the
// dispatch loop. Ctrl+C (or the last worker) stops the loop.
use msgthread::{BridgeError, ManagerBuilder};
use std::env;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

enum Event {
    Ping { worker: usize, seq: usize },
    Done { worker: usize },
}

fn main() -> Result<(), BridgeError> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let workers: usize = args.get(1).and_then(|s| s.parse().ok()).unwrap_or(4usize).max(1);
    let pings: usize = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(1000);

    let delivered = Arc::new(AtomicUsize::new(0));
    let finished = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&delivered);
    let manager = ManagerBuilder::new().build(move |event: Event| match event {
        Event::Ping { worker, seq } => {
            let n = counter.fetch_add(1, Ordering::Relaxed) + 1;
            if n % 1000 == 0 {
                println!("Delivered {} pings (last: worker {} seq {})", n, worker, seq);
            }
        }
        Event::Done { worker } => println!("Worker {} finished", worker),
    })?;

    let stopper = manager.stopper();
    ctrlc::set_handler(move || stopper.stop()).expect("Error setting Ctrl+C handler");

    println!("Main: {} workers x {} pings", workers, pings);
    let start = std::time::Instant::now();

    let mut handles = Vec::with_capacity(workers);
    for worker in 0..workers {
        let queue = manager.message_queue();
        let caller = manager.sync_caller();
        let stopper = manager.stopper();
        let delivered = Arc::clone(&delivered);
        let finished = Arc::clone(&finished);
        handles.push(thread::spawn(move || -> Result<(), BridgeError> {
            for seq in 0..pings {
                queue
                    .post(Event::Ping { worker, seq })
                    .map_err(|e| e.reason)?;
            }
            // Ask the message thread how far it got
            let seen = caller.call(move || delivered.load(Ordering::Relaxed))?;
            println!("Worker {}: message thread has delivered {} so far", worker, seen);
            queue.post(Event::Done { worker }).map_err(|e| e.reason)?;

            // Runs on the message thread, so the last worker in stops the loop
            caller.call(move || {
                if finished.fetch_add(1, Ordering::Relaxed) + 1 == workers {
                    stopper.stop();
                }
            })?;
            Ok(())
        }));
    }

    manager.run_dispatch_loop()?;
    let elapsed = start.elapsed();

    println!(
        "Main: delivered {} pings in {:.2?} ({:.2} msgs/sec)",
        delivered.load(Ordering::Relaxed),
        elapsed,
        delivered.load(Ordering::Relaxed) as f64 / elapsed.as_secs_f64()
    );

    // Drain first: a worker still blocked in a call is released by it
    let report = manager.shutdown()?;
    println!("Main: shutdown drain {:?}", report);

    for handle in handles {
        match handle.join() {
            Ok(Err(e)) => eprintln!("Worker stopped early: {}", e),
            Err(_) => eprintln!("Worker panicked"),
            Ok(Ok(())) => {}
        }
    }
    Ok(())
}
