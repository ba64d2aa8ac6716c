//! Example walking one student through a rescheduled assessment
//!
//! This example shows how to:
//! 1. Assign a default window
//! 2. Poll access as time passes
//! 3. Reschedule the window and cancel the reschedule
//!
//! To run this example:
//! ```bash
//! cargo run --example reschedule_walkthrough
//! ```

use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};

use assessment_access::clock::FixedClock;
use assessment_access::config::EngineConfig;
use assessment_access::db::repositories::LocalRepository;
use assessment_access::models::{ScheduleKey, TeacherId};
use assessment_access::services::{PollingGateway, RescheduleRequest};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Assessment Access Walkthrough ===\n");

    let start = Utc.with_ymd_and_hms(2025, 3, 10, 10, 0, 0).single().ok_or("bad date")?;
    let clock = FixedClock::new(start - Duration::hours(2));
    let gateway = PollingGateway::new(
        Arc::new(LocalRepository::new()),
        EngineConfig::default(),
        Arc::new(clock.clone()),
    );
    let key = ScheduleKey::new(1, 42);

    // Step 1: Assign the default window
    println!("1. Assigning window for {}...", key);
    let stored = gateway.assign_window(key, start).await?;
    println!(
        "   {} -> {} (grace until {})\n",
        stored.window.window_start, stored.window.window_end, stored.window.grace_end
    );

    // Step 2: Poll while time passes
    println!("2. Polling access...");
    for offset in [-60, 0, 59, 75, 91] {
        clock.set(start + Duration::minutes(offset));
        let d = gateway
            .check_access(key.assessment_id, key.student_profile_id)
            .await?;
        println!(
            "   {} status={:?} remaining={}min untilOpen={}min",
            d.current_time.format("%H:%M"),
            d.status,
            d.minutes_remaining,
            d.minutes_until_open
        );
    }
    println!();

    // Step 3: Reschedule, then cancel
    clock.set(start - Duration::hours(2));
    println!("3. Rescheduling three hours later...");
    let applied = gateway
        .propose_reschedule(&RescheduleRequest {
            schedule_key: key,
            new_window_start: start + Duration::hours(3),
            reason: "Student is at a regional science fair".to_string(),
            teacher_id: TeacherId::new(7),
        })
        .await?;
    println!(
        "   Reschedule {} ({}), warnings: {}",
        applied.reschedule.id,
        applied.reschedule.shift_description(),
        applied.warnings.len()
    );

    let cancelled = gateway
        .cancel_reschedule(applied.reschedule.id, Some("Science fair moved".to_string()))
        .await?;
    let restored = gateway.get_window(key).await?;
    println!(
        "   Cancelled ({:?}); window back at {}",
        cancelled.status(),
        restored.window.window_start
    );

    Ok(())
}
