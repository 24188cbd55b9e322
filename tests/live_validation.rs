use std::{env, sync::Once};

use legal_digest::{
    config, inference,
    processing::{JobControls, SummarizationService, SummarizeOptions},
};

static INIT: Once = Once::new();

fn set_default_env(key: &str, value: &str) {
    let needs_value = env::var(key).map(|v| v.trim().is_empty()).unwrap_or(true);
    if needs_value {
        // SAFETY: Tests run serially via Once and we intentionally mutate process env.
        unsafe {
            env::set_var(key, value);
        }
    }
}

fn init_config_once() {
    INIT.call_once(|| {
        set_default_env("SUMMARIZATION_PROVIDER", "ollama");
        set_default_env("SUMMARIZATION_MODEL", "llama3.2");
        set_default_env("OLLAMA_URL", "http://127.0.0.1:11434");
        config::init_config();
    });
}

fn live_service() -> SummarizationService {
    let config = config::get_config();
    let client = inference::build_inference_client(config).expect("inference client");
    SummarizationService::new(client, config.pipeline_settings())
}

#[tokio::test]
#[ignore = "Requires live Ollama"]
async fn live_ollama_engine_initializes() {
    init_config_once();
    let service = live_service();
    service
        .initialize()
        .await
        .expect("Ollama should accept the warm-up request");
    assert_eq!(service.engine().status().label(), "ready");
}

#[tokio::test]
#[ignore = "Requires live Ollama"]
async fn live_ollama_summarizes_a_clause() {
    init_config_once();
    let service = live_service();
    let text = "The Supplier shall deliver the Goods to the Buyer's warehouse no later than \
        thirty (30) days after the Effective Date. Title and risk of loss pass to the Buyer upon \
        delivery. The Buyer shall pay each invoice within forty-five (45) days of receipt.";

    let outcome = service
        .summarize_text(text, SummarizeOptions::default(), JobControls::default())
        .await
        .expect("live summarization");
    assert!(!outcome.summary.trim().is_empty(), "summary must not be empty");
    assert_eq!(outcome.failed_chunks, 0, "no chunk should fail: {outcome:?}");
}
