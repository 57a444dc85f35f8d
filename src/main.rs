use std::error::Error;
use std::{env, fs};

use leadflow::{prepare_lead, EventKind, InboundEvent, IntakeError};

/// Dry-run a saved webhook body through extraction and normalization.
///
/// Usage: `leadflow <payload.json>`
fn main() -> Result<(), Box<dyn Error>> {
    let Some(path) = env::args().nth(1) else {
        eprintln!("usage: leadflow <payload.json>");
        std::process::exit(2);
    };

    let body = fs::read(&path)?;
    let event = InboundEvent::from_slice(&body)?;

    let (Some(kind), Some(call)) = (event.kind(), event.call.as_ref()) else {
        return Err(IntakeError::MalformedEnvelope("event and call are required".into()).into());
    };
    if kind != EventKind::CallAnalyzed {
        println!("event {kind} carries no lead data");
        return Ok(());
    }

    let lead = prepare_lead(call)?;
    println!("{}", serde_json::to_string_pretty(&lead)?);

    Ok(())
}
