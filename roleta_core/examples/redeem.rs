use chrono::{Duration, Utc};
use roleta_core::{LinkRegistry, PrizeWheel, RedemptionService, DEFAULT_TTL_SECS};

fn main() {
    // Example end-to-end redemption
    let registry = LinkRegistry::new(Duration::seconds(DEFAULT_TTL_SECS));
    let service =
        RedemptionService::new(registry, PrizeWheel::simple_default()).expect("valid wheel");

    let issued = service.generate_link(Utc::now());
    println!("issued {} valid until {}", issued.id, issued.expires_at);

    match service.validate_link(&issued.id, Utc::now()) {
        Ok(()) => println!("link is redeemable"),
        Err(err) => println!("link rejected: {err}"),
    }

    let prize = service
        .redeem_link(&issued.id, Utc::now())
        .expect("fresh link redeems");
    println!("won: {prize}");

    // A second attempt reports the original prize instead of drawing again.
    let second = service.redeem_link(&issued.id, Utc::now());
    println!("second attempt: {second:?}");
}
