//! Example driving a view model and waiting for its property to change.
//!
//! This example shows how to:
//! - Declare observable properties on a view model
//! - Block a test thread until a property changes
//! - Await a change from async code without blocking the runtime
//! - Handle a timeout when nothing changes
//!
//! Run with: cargo run --example view_model

use observation_test_utils::prelude::*;
use std::sync::Arc;
use std::time::Duration;

struct ViewModel {
    property: Observable<i32>,
    status: Observable<String>,
}

impl ViewModel {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            property: Observable::new(0),
            status: Observable::new("idle".to_string()),
        })
    }

    fn load_property(&self) {
        self.property.update(|value| value + 1);
    }

    async fn load_status(self: Arc<Self>) {
        tokio::time::sleep(Duration::from_millis(50)).await;
        self.status.set("loaded".to_string());
    }
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    println!("=== View Model Example ===\n");

    let vm = ViewModel::new();

    // Blocking wait, as a synchronous test would do it
    println!("--- Blocking wait for `property` ---");
    let worker = Arc::clone(&vm);
    let blocking_vm = Arc::clone(&vm);
    tokio::task::spawn_blocking(move || {
        let loader = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(50));
            worker.load_property();
        });
        let result = wait_for_change(|vm| &vm.property, &*blocking_vm, Duration::from_secs(1));
        let _ = loader.join();
        result
    })
    .await??;
    println!("property is now {}\n", vm.property.get());

    // Suspending wait, as an async test would do it
    println!("--- Awaiting a change to `status` ---");
    let waiter = ChangeWaiter::builder()
        .description("status loaded")
        .build()?;
    let change = waiter.await_change(|vm| &vm.status, &*vm);
    tokio::spawn(Arc::clone(&vm).load_status());
    change.await?;
    println!("status is now {:?}\n", vm.status.get());

    // Nothing changes: the wait reports a timeout instead of hanging
    println!("--- Waiting on a property nobody touches ---");
    match await_change(|vm| &vm.property, &*vm, Duration::from_millis(100)).await {
        Ok(()) => println!("unexpected change"),
        Err(e) => println!("{}", e),
    }

    println!("\nExample complete!");
    Ok(())
}
