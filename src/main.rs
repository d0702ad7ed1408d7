use std::io::Write;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};

use polysight_rag::config::{self, Config};
use polysight_rag::llm::ChatModel;
use polysight_rag::rag::embeddings::EmbeddingClient;
use polysight_rag::rag::retriever::Retriever;
use polysight_rag::rag::vector_store::{StoreError, VectorStore};
use polysight_rag::rag::RagChain;

#[derive(Parser, Debug)]
#[command(name = "polysight-rag")]
#[command(about = "Question answering over the Polysight knowledge base")]
struct Args {
    /// Question to answer. Starts the interactive loop when omitted.
    question: Vec<String>,
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    config::init_tracing();

    let args = Args::parse();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Configuration error: {}", e);
            tracing::info!("Check the .env file and ensure all required variables are set");
            std::process::exit(1);
        }
    };

    if let Err(e) = run(&config, args).await {
        tracing::error!("Critical application error: {:#}", e);
        if e.downcast_ref::<StoreError>().is_some() {
            tracing::info!("Make sure Qdrant is running: docker-compose up -d");
        }
        std::process::exit(1);
    }
}

async fn run(config: &Config, args: Args) -> Result<()> {
    tracing::info!("Initializing RAG components");
    let llm = ChatModel::new(config);
    let embeddings = EmbeddingClient::new(config);
    let store =
        VectorStore::connect(&config.qdrant_url, &config.qdrant_collection, embeddings).await?;
    let retriever = Retriever::new(store);
    let chain = RagChain::new(llm, retriever);
    tracing::info!("RAG system ready");

    if args.question.is_empty() {
        interactive_loop(&chain).await
    } else {
        let question = args.question.join(" ");
        let answer = ask(&chain, &question).await?;
        println!("{}", answer);
        Ok(())
    }
}

async fn ask(chain: &RagChain, question: &str) -> Result<String> {
    tracing::info!("Question: {}", question);
    let started = Instant::now();
    let ctx = chain.answer(question).await?;
    let answer = ctx.answer.context("pipeline produced no answer")?;
    tracing::info!("Answer ready in {} ms", started.elapsed().as_millis());
    Ok(answer)
}

async fn interactive_loop(chain: &RagChain) -> Result<()> {
    println!("Ask questions about Polysight. Type \"exit\" to quit.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("? ");
        std::io::stdout().flush()?;

        let line = match lines.next_line().await? {
            Some(line) => line,
            None => break,
        };
        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if is_quit_command(question) {
            println!("Thank you for using the Polysight assistant!");
            break;
        }

        // Per-question errors keep the loop alive.
        match ask(chain, question).await {
            Ok(answer) => println!("{}\n", answer),
            Err(e) => tracing::error!("Error while processing question: {:#}", e),
        }
    }
    Ok(())
}

fn is_quit_command(input: &str) -> bool {
    let lowered = input.to_lowercase();
    ["exit", "quit", "koniec"]
        .iter()
        .any(|cmd| lowered.contains(cmd))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quit_commands() {
        assert!(is_quit_command("exit"));
        assert!(is_quit_command("QUIT"));
        assert!(is_quit_command("koniec"));
        assert!(is_quit_command("please exit now"));
    }

    #[test]
    fn test_regular_questions_do_not_quit() {
        assert!(!is_quit_command("What are the system requirements?"));
        assert!(!is_quit_command("how do I export reports"));
    }
}
