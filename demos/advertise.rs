//! Advertise a demo HTTP service until interrupted.
//!
//! ```sh
//! cargo run --example advertise -- "My Web Server" 8080
//! ```

use std::time::Duration;

use mdns_discovery::{AdvertiserConfig, Service, ServiceAdvertiser};

#[tokio::main]
async fn main() -> mdns_discovery::Result<()> {
    let mut args = std::env::args().skip(1);
    let name = args.next().unwrap_or_else(|| "Demo Service".to_owned());
    let port: u16 = args
        .next()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);

    let advertiser = ServiceAdvertiser::new(AdvertiserConfig::default());
    advertiser.start().await?;

    let service = Service::new(&name, "_http._tcp").with_port(port);
    println!("advertising {} on port {port}", service.full_name());
    advertiser.register(service).await?;

    // Announcements and query responses run in the background.
    loop {
        tokio::time::sleep(Duration::from_secs(3600)).await;
    }
}
