//! A complete example showing one agent bound to three different platforms.
//!
//! This example demonstrates:
//! - Declaring an agent spec with behavioral rules and a structured contract
//! - Compiling the spec once
//! - Binding the same compiled agent to every platform with credentials
//! - Invoking each binding against the same input
//!
//! Set OPENAI_API_KEY, ANTHROPIC_API_KEY, and/or GOOGLE_API_KEY before
//! running; platforms without a key are skipped.

use std::sync::Arc;

use promptforge::prelude::*;

const SOURCE_TEXT: &str = "The quik brown fox jumpd over the lazzy dog. \
It's tale waggled as it wlaked away.";

#[tokio::main]
async fn main() -> Result<(), AgentError> {
    let spec = AgentSpec::builder(
        "typo_fixer",
        "You are given a text and you fix all typos in it: spelling, obvious grammatical \
         mistakes, and misused homophones. You change nothing else about the text.",
    )
    .do_item("Preserve the author's voice, formatting, and word choice wherever possible.")
    .do_item("Fix misspellings, doubled words, and incorrect homophones.")
    .do_not_item("Do not rewrite sentences for style.")
    .do_not_item("Do not add or remove content.")
    .contract(OutputContract::structured(
        r#"{ "corrected_text": "string", "corrections": ["string"] }"#,
    ))
    .build()?;

    let compiled = Arc::new(CompiledAgent::compile(&spec)?);

    let mut binder = Binder::new();
    if let Ok(key) = std::env::var("OPENAI_API_KEY") {
        binder = binder.with_openai(key);
    }
    if let Ok(key) = std::env::var("ANTHROPIC_API_KEY") {
        binder = binder.with_anthropic(key);
    }
    if let Ok(key) = std::env::var("GOOGLE_API_KEY") {
        binder = binder.with_gemini(key);
    }

    let platforms = binder.configured_platforms();
    if platforms.is_empty() {
        eprintln!("No API keys found in the environment; nothing to run.");
        return Ok(());
    }

    println!("Fixing typos against the same source text using {} platform(s).", platforms.len());

    for platform in platforms {
        let bound = binder.bind(&compiled, platform, None)?;
        println!("\nRunning against {} ({}):", platform, bound.backend().model_name());

        match bound.invoke(SOURCE_TEXT, None).await {
            Ok(output) => match output.as_value() {
                Some(value) => println!("{:#}", value),
                None => println!("{:?}", output),
            },
            Err(e) => eprintln!("{} failed: {}", platform, e),
        }
    }

    Ok(())
}
