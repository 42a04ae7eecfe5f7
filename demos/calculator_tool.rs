//! Registers an extra tool next to the built-in document search.
//!
//! ```text
//! cargo run --example calculator_tool -- notes.txt
//! ```

use docent::prelude::*;
use std::sync::Arc;

struct Calculator;

#[async_trait]
impl Plugin for Calculator {
    fn name(&self) -> &str {
        "calculator"
    }

    fn description(&self) -> &str {
        "Evaluates a single binary arithmetic expression such as '12.5 * 4'."
    }

    async fn execute(&self, input: &str) -> docent_plugin::Result<PluginOutput> {
        let parts: Vec<&str> = input.split_whitespace().collect();
        let [lhs, op, rhs] = parts.as_slice() else {
            return Err(PluginError::InvalidInput(format!(
                "expected '<number> <op> <number>', got '{}'",
                input
            )));
        };

        let parse = |s: &str| {
            s.parse::<f64>()
                .map_err(|_| PluginError::InvalidInput(format!("'{}' is not a number", s)))
        };
        let (lhs, rhs) = (parse(*lhs)?, parse(*rhs)?);

        let value = match *op {
            "+" => lhs + rhs,
            "-" => lhs - rhs,
            "*" | "x" => lhs * rhs,
            "/" if rhs == 0.0 => return Err(PluginError::ExecutionFailed("division by zero".into())),
            "/" => lhs / rhs,
            other => return Err(PluginError::InvalidInput(format!("unknown operator '{}'", other))),
        };

        Ok(PluginOutput::new(value.to_string()))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive("docent_core=info".parse()?),
        )
        .init();

    let config = Config::load_or_default();
    let provider = Arc::new(OllamaProvider::from_config(&config.llm));
    let tools: Vec<Arc<dyn Plugin>> = vec![Arc::new(Calculator)];
    let mut session = Session::with_tools(config, provider, tools)?;

    let files: Vec<_> = std::env::args().skip(1).collect();
    if !files.is_empty() {
        let uploads = files.iter().map(Upload::from_path).collect::<Result<Vec<_>, _>>()?;
        let ingested = session.ingest(uploads).await?;
        println!("Indexed {} chunks\n", ingested.chunks.len());
    }

    for question in [
        "What do the documents say about the budget?",
        "What is 1250 * 12?",
    ] {
        match session.ask(question).await {
            Ok(outcome) => println!("Q: {}\nA: {} ({} iterations)\n", question, outcome.output, outcome.iterations),
            Err(e) => println!("Q: {}\n{}\n", question, e.user_message()),
        }
    }

    Ok(())
}
