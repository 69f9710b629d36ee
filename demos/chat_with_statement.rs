use dotenv::dotenv;
use financial_statement_analyzer::llm::{
    AnalysisEvent, FinancialAssistant, ImageInput, LlmAnalyzer, LlmBackend,
};
use financial_statement_analyzer::*;
use std::error::Error;
use std::io::{self, Write};
use std::sync::Arc;
use tokio::sync::mpsc;

fn describe(event: &AnalysisEvent) -> String {
    match event {
        AnalysisEvent::Starting { document_kind } => format!("Reading {} document", document_kind),
        AnalysisEvent::VisionExtraction => "Reading image with vision model".to_string(),
        AnalysisEvent::LocalExtraction { fields_found } => {
            format!("Found {} metrics locally", fields_found)
        }
        AnalysisEvent::StructuredExtraction => "Asking model for structured metrics".to_string(),
        AnalysisEvent::Merged { fields_changed } => {
            format!("Model added or corrected {} metrics", fields_changed)
        }
        AnalysisEvent::GeneratingInsights => "Writing insights".to_string(),
        AnalysisEvent::Degraded { stage, reason } => format!("{} skipped: {}", stage, reason),
        AnalysisEvent::Success => "Done".to_string(),
    }
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn Error>> {
    dotenv().ok();

    let path = std::env::args()
        .nth(1)
        .ok_or("usage: chat_with_statement <statement.txt | page.png>")?;

    let backend = LlmBackend::from_env()?;
    println!("🤖 Using {} for extraction and Q&A\n", backend.provider());
    let llm = Arc::new(backend);

    let analyzer = LlmAnalyzer::new(
        FinancialAnalyzer::new(AnalyzerConfig::from_env()?),
        llm.clone(),
    );

    let (tx, mut rx) = mpsc::channel(16);
    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            println!("  • {}", describe(&event));
        }
    });

    let report = if is_image_path(&path) {
        let image = ImageInput::from_path(&path).await?;
        analyzer.analyze_image(&image, Some(tx)).await
    } else {
        let text = tokio::fs::read_to_string(&path).await?;
        analyzer
            .analyze(&DocumentInput::from_text(text), Some(tx))
            .await
    };
    printer.await?;

    if report.is_insufficient() {
        println!("\n⚠️  No financial metrics could be extracted from {}", path);
        return Ok(());
    }

    println!(
        "\n✅ {} metrics, {} ratios, {} risks",
        report.financial_data.known_count(),
        report.ratios.len(),
        report.risks.len()
    );
    if let Some(insights) = &report.insights {
        println!("\n💡 Insights:\n{}\n", insights);
    }

    let mut assistant = FinancialAssistant::new(llm, report);
    println!("Ask questions about the statement (type 'reset' to clear history, 'quit' to exit).");
    println!("------------------------------------------------------------------");

    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        let prompt = input.trim();

        if prompt.eq_ignore_ascii_case("quit") || prompt.eq_ignore_ascii_case("exit") {
            break;
        }
        if prompt.eq_ignore_ascii_case("reset") {
            assistant.reset_conversation();
            println!("History cleared.");
            continue;
        }
        if prompt.is_empty() {
            continue;
        }

        match assistant.ask(prompt).await {
            Ok(answer) => {
                println!("\n{}\n", answer);
                println!("------------------------------------------------------------------");
            }
            Err(e) => eprintln!("❌ Error: {}", e),
        }
    }

    Ok(())
}

fn is_image_path(path: &str) -> bool {
    let lowered = path.to_lowercase();
    [".png", ".jpg", ".jpeg", ".webp", ".gif"]
        .iter()
        .any(|ext| lowered.ends_with(ext))
}
