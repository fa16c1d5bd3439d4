//! Ticker producer demo
//!
//! Run with: cargo run --example ticker
//!
//! A single producer posts a card every second. Midway through, the registry
//! service is withdrawn (posts degrade to no-ops while the producer keeps
//! running), then published again, and posting resumes without restarting
//! the producer. Remaining cards are dismissed at the end, driving the
//! notification hook.

use std::sync::Arc;
use std::time::Duration;

use cardstream::{
    Card, CardRegistry, ConnectionBroker, InProcessBroker, Producer, ProducerConfig,
    ProducerHandler, ServiceId,
};

/// Handler that logs dismissals delivered by the registry
struct TickerHandler;

impl ProducerHandler for TickerHandler {
    fn on_card_dismissed(&self, card: &Card) {
        tracing::info!(card = %card.id(), "card dismissed by the host");
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("cardstream=debug".parse()?)
                .add_directive("ticker=info".parse()?),
        )
        .init();

    let broker = Arc::new(InProcessBroker::new());
    let registry = Arc::new(CardRegistry::new());
    let service = ServiceId::default();
    broker.publish_service(service.clone(), Arc::clone(&registry));

    let producer = Producer::new(
        ProducerConfig::new("ticker"),
        Arc::clone(&broker) as Arc<dyn ConnectionBroker>,
        TickerHandler,
    );
    producer.start();

    let mut ticks = tokio::time::interval(Duration::from_secs(1));
    let mut posted = Vec::new();

    for n in 0..10u32 {
        ticks.tick().await;

        if n == 4 {
            tracing::info!("withdrawing the registry service");
            broker.withdraw_service(service.clone());
        }
        if n == 7 {
            tracing::info!("publishing the registry service again");
            broker.publish_service(service.clone(), Arc::clone(&registry));
        }

        let card = Card::new(format!("tick {n}"));
        if producer.post_card(&card).await {
            posted.push(card);
        } else {
            tracing::warn!(tick = n, "card dropped, service unreachable");
        }

        // Keep at most three cards on display.
        if posted.len() > 3 {
            let oldest = posted.remove(0);
            producer.remove_card(&oldest).await;
        }
    }

    for card in &posted {
        registry.dismiss_card(card.id()).await;
    }
    tokio::time::sleep(Duration::from_millis(50)).await;

    let stats = producer.stats();
    tracing::info!(
        posted = stats.posted,
        dropped = stats.dropped_posts,
        dismissals = stats.dismissals,
        cards_left = registry.card_count().await,
        "demo complete"
    );

    producer.stop();
    Ok(())
}
