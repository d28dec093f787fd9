use std::{sync::Arc, time::Duration};

use eventbus::*;

// Define your topics
#[derive(Topic, Debug)]
struct Greeting {
    name: String,
}

#[derive(Topic, Debug)]
enum Download {
    Progress(u8),
    Finished { path: String },
}

// A subscriber identified by its address
struct StatusBar;

impl StatusBar {
    fn attach(self: &Arc<Self>, bus: &Bus) {
        bus.subscribe(ClientKey::identity_of(&**self), |d: &Download| match d {
            Download::Progress(p) => println!("[status] {p}%"),
            Download::Finished { path } => println!("[status] saved to {path} ({})", d.name()),
        });
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .init();

    let bus = Bus::new();

    // Runs on the sending thread
    bus.subscribe_on("greeter", DispatchOn::Inline, |g: &Greeting| {
        println!("Hello, {}!", g.name);
    });

    // Runs on the main queue
    let status = Arc::new(StatusBar);
    status.attach(&bus);

    // Runs on a dedicated worker
    let worker = SerialQueue::new("logger")?;
    bus.subscribe_on("logger", DispatchOn::executor(&worker), |d: &Download| {
        println!("[logger] {d:?}");
    });

    bus.send(Greeting {
        name: "World".into(),
    });
    for p in [25, 50, 100] {
        bus.send(Download::Progress(p));
    }
    bus.send(Download::Finished {
        path: "/tmp/file.bin".into(),
    });

    bus.unsubscribe_all("logger");
    bus.unsubscribe_all(ClientKey::identity_of(&*status));

    worker.shutdown();
    std::thread::sleep(Duration::from_millis(50)); // Let the main queue catch up
    Ok(())
}
