use serde::{Deserialize, Serialize};

use courier_core::{
    AsyncDispatcher, BatchedVersionedMessage, CodecKind, VersionId, Versioned, VersionedMessage,
};

#[derive(Debug, Serialize, Deserialize)]
struct TelemetryV1 {
    sensor: String,
    value: i64,
}

impl Versioned for TelemetryV1 {
    const SCHEMA: &'static str = "demo.telemetry";
    const VERSION: u32 = 1;
}

#[derive(Debug, Serialize, Deserialize)]
struct TelemetryV2 {
    sensor: String,
    value: i64,
    unit: String,
}

impl Versioned for TelemetryV2 {
    const SCHEMA: &'static str = "demo.telemetry";
    const VERSION: u32 = 2;
}

// Intentionally never registered - exercises the fallback path.
#[derive(Debug, Serialize, Deserialize)]
struct AuditRecord {
    actor: String,
}

impl Versioned for AuditRecord {
    const SCHEMA: &'static str = "demo.audit";
    const VERSION: u32 = 1;
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // (A) Build the dispatcher: one handler per schema version we understand,
    //     a fallback for everything else, and an error action that observes
    //     handler faults instead of aborting (throw_on_error = false).
    let dispatcher = AsyncDispatcher::new(CodecKind::Json, false)
        .on::<TelemetryV1, _, _>(|t: TelemetryV1| async move {
            println!("v1 reading: {} = {}", t.sensor, t.value);
            Ok(())
        })?
        .on::<TelemetryV2, _, _>(|t: TelemetryV2| async move {
            println!("v2 reading: {} = {} {}", t.sensor, t.value, t.unit);
            Ok(())
        })?
        .otherwise(|raw| async move {
            println!("unknown version, raw payload kept: {raw}");
        })
        .on_error(|fault| async move {
            eprintln!("handler fault observed: {fault}");
        });

    // (B) Producer side: wrap typed entities into version-tagged envelopes.
    let v1 = VersionedMessage::encode(
        &TelemetryV1 {
            sensor: "temp-0".into(),
            value: 21,
        },
        CodecKind::Json,
    )?;
    let v2 = VersionedMessage::encode(
        &TelemetryV2 {
            sensor: "temp-0".into(),
            value: 21,
            unit: "celsius".into(),
        },
        CodecKind::Json,
    )?;
    let unknown = VersionedMessage::encode(
        &AuditRecord {
            actor: "nobody".into(),
        },
        CodecKind::Json,
    )?;

    // (C) Batch dispatch: strictly in order, the unregistered version lands
    //     in the fallback, the rest of the batch still runs.
    let batch = BatchedVersionedMessage::from(vec![v1, unknown, v2]);
    dispatcher.post_batch(&batch).await?;

    // (D) Per-call codec override: the same handler serves an XML envelope.
    let xml = VersionedMessage::encode(
        &TelemetryV1 {
            sensor: "hum-3".into(),
            value: 58,
        },
        CodecKind::Xml,
    )?;
    dispatcher.post_with(&xml, CodecKind::Xml).await?;

    // (E) Envelope round-trip through its own serialized form, re-versioned
    //     on the way in (schema aliasing).
    let wire = VersionedMessage::encode(
        &TelemetryV1 {
            sensor: "temp-9".into(),
            value: -3,
        },
        CodecKind::Json,
    )?
    .to_transport(CodecKind::Json)?;
    let replayed = VersionedMessage::from_transport(
        &wire,
        CodecKind::Json,
        Some(VersionId::new("demo.telemetry", 1)),
    )?;
    dispatcher.post(&replayed).await?;

    Ok(())
}
