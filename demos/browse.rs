//! Browse the local network for a DNS-SD service type and print every event.
//!
//! ```sh
//! cargo run --example browse -- _http._tcp
//! ```

use mdns_discovery::{BrowserConfig, BrowserEvent, ServiceBrowser};

#[tokio::main]
async fn main() -> mdns_discovery::Result<()> {
    let service_type = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "_http._tcp".to_owned());

    let browser = ServiceBrowser::new(BrowserConfig::default());
    let mut events = browser.take_events().expect("first take of the stream");

    browser.start().await?;
    browser.browse(&service_type).await?;
    println!("browsing for {service_type}, ctrl-c to quit");

    while let Some(event) = events.recv().await {
        match event {
            BrowserEvent::Found(service) => {
                println!("+ {}", service.full_name());
            }
            BrowserEvent::Updated(service) => {
                let host = service.host.as_deref().unwrap_or("?");
                let port = service.port.map(|p| p.to_string()).unwrap_or_default();
                println!("~ {} -> {host}:{port} {:?}", service.full_name(), service.addresses());
            }
            BrowserEvent::Removed(service) => {
                println!("- {}", service.full_name());
            }
            BrowserEvent::Error(err) => {
                eprintln!("! {err}");
            }
        }
    }
    Ok(())
}
