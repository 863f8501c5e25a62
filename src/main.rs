use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use linda_quiz::services::parser;
use linda_quiz::utils::logging;
use linda_quiz::{
    ActivityType, AiBackend, AnnotationSet, Config, OpenRouterClient, QuizSession, SessionCtx,
    SourceText,
};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env();
    logging::init(config.verbose_logging);

    let mut args = std::env::args().skip(1);
    let (Some(text_path), Some(table_path), Some(activity)) =
        (args.next(), args.next(), args.next())
    else {
        eprintln!("usage: linda_quiz <text-file> <annotations-csv> <activity>");
        eprintln!("activities: 5w, tesi, argomento, connettivo");
        std::process::exit(2);
    };

    let activity: ActivityType = activity
        .parse()
        .map_err(|e: String| anyhow::anyhow!(e))
        .context("unknown activity")?;

    let text = std::fs::read_to_string(&text_path)
        .with_context(|| format!("cannot read text file {text_path}"))?;
    let table = std::fs::read_to_string(&table_path)
        .with_context(|| format!("cannot read annotation table {table_path}"))?;

    let source = SourceText::from_extracted(text)?;
    let annotations = AnnotationSet::from_table(&table, &source)?;
    info!(
        language = source.language.code(),
        annotations = annotations.len(),
        activity = %activity,
        "session inputs loaded"
    );

    let backend = Arc::new(OpenRouterClient::new(&config));
    if !backend.is_available().await {
        warn!("AI backend unreachable, the quiz will be built from the annotations only");
    }

    let ctx = SessionCtx::new(annotations, source, activity);
    let mut session = QuizSession::new(ctx, backend, &config);
    let quiz = session.generate().await;

    println!("{}", parser::render_quiz(quiz));
    if quiz.degraded {
        println!("(quiz di riserva generato senza AI)");
    }
    Ok(())
}
