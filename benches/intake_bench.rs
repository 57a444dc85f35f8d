use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use leadflow::{prepare_lead, InboundEvent, InMemoryStore, LeadPipeline, PipelineConfig};
use serde_json::json;
use std::hint::black_box;
use std::sync::Arc;

fn analyzed_body(call_id: &str, transcript_words: usize) -> Vec<u8> {
    let transcript = "Agent: How can I help? Caller: I want to sell. ".repeat(transcript_words / 10 + 1);
    json!({
        "event": "call_analyzed",
        "call": {
            "call_id": call_id,
            "from_number": "+1 (555) 123-4567",
            "to_number": "+15550001111",
            "duration_ms": 187_000,
            "transcript": transcript,
            "call_analysis": {"custom_analysis_data": {
                "name": "Grace Hopper",
                "email": "grace@example.com",
                "type": "Seller",
                "lead_quality": "warm",
                "timeframe": "3 months",
                "property_details": "3br colonial"
            }},
            "retell_llm_dynamic_variables": {"customer_name": "ignored", "status": "contacted"}
        }
    })
    .to_string()
    .into_bytes()
}

/// Parse + extract + normalize for growing transcripts
fn bench_prepare_lead(c: &mut Criterion) {
    let mut group = c.benchmark_group("prepare_lead");

    for words in [10, 1_000, 10_000] {
        let body = analyzed_body("bench", words);
        group.throughput(Throughput::Bytes(body.len() as u64));
        group.bench_function(format!("words_{words}"), |b| {
            b.iter(|| {
                let event = InboundEvent::from_slice(black_box(&body)).expect("valid body");
                let call = event.call.as_ref().expect("call present");
                prepare_lead(black_box(call)).expect("lead should normalize")
            });
        });
    }

    group.finish();
}

/// Full pipeline against the in-memory store; every iteration is a new call id
fn bench_pipeline_in_memory(c: &mut Criterion) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("runtime");
    let config = PipelineConfig {
        dedupe: leadflow::DedupeConfig {
            match_empty_transcript: false,
        },
        ..Default::default()
    };
    let pipeline = LeadPipeline::with_store(Arc::new(InMemoryStore::new()), config);
    let mut counter = 0u64;

    c.bench_function("pipeline_call_analyzed", |b| {
        b.iter(|| {
            counter += 1;
            let body = json!({
                "event": "call_analyzed",
                "call": {"call_id": format!("c{counter}"), "from_number": "555-123-4567"}
            })
            .to_string();
            runtime
                .block_on(pipeline.handle_body(body.as_bytes()))
                .expect("pipeline should succeed")
        });
    });
}

criterion_group!(benches, bench_prepare_lead, bench_pipeline_in_memory);
criterion_main!(benches);
