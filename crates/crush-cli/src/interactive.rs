//! Line-oriented swipe and chat loops over stdin.
//!
//! Both loops stop at end of input, on `quit`, or as soon as the session's
//! cancellation token fires, even while waiting at the prompt.

use std::io::Write;

use anyhow::Result;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};
use tokio_util::sync::CancellationToken;

use crush_client::{ApiError, ChatSession, SwipeOutcome, SwipeSession};
use crush_core::{Displacement, InteractionType, Profile, SUGGESTED_TOPICS, Sender};

#[derive(Clone, Debug, PartialEq)]
pub enum SwipeCommand {
    Press(InteractionType),
    Drag(Displacement),
    Refresh,
    Help,
    Quit,
}

pub fn parse_swipe_command(line: &str) -> Result<Option<SwipeCommand>, String> {
    let mut parts = line.split_whitespace();
    let Some(head) = parts.next() else {
        return Ok(None);
    };

    let command = match head.to_ascii_lowercase().as_str() {
        "like" | "l" | "right" => SwipeCommand::Press(InteractionType::Like),
        "pass" | "p" | "left" => SwipeCommand::Press(InteractionType::Pass),
        "love" | "u" | "up" => SwipeCommand::Press(InteractionType::Love),
        "drag" | "d" => {
            let mut coord = |name: &str| -> Result<f64, String> {
                parts
                    .next()
                    .ok_or_else(|| format!("drag needs <dx> <dy> (missing {name})"))?
                    .parse::<f64>()
                    .map_err(|e| format!("bad {name}: {e}"))
            };
            let dx = coord("dx")?;
            let dy = coord("dy")?;
            SwipeCommand::Drag(Displacement::new(dx, dy))
        }
        "refresh" | "r" => SwipeCommand::Refresh,
        "help" | "h" | "?" => SwipeCommand::Help,
        "quit" | "q" | "exit" => SwipeCommand::Quit,
        other => return Err(format!("unknown command: {other}")),
    };
    Ok(Some(command))
}

const SWIPE_HELP: &str = "commands: like | pass | love | drag <dx> <dy> | refresh | quit";

pub fn render_card(profile: &Profile) -> String {
    let mut card = profile.headline();
    if !profile.bio.is_empty() {
        card.push_str(&format!("\n  {}", profile.bio));
    }
    if let Some(photo) = profile.cover_photo() {
        card.push_str(&format!("\n  photo: {photo}"));
    }
    if let Some(details) = &profile.matrimony_details {
        card.push_str(&format!(
            "\n  Education: {}\n  Profession: {}\n  Family: {}",
            details.education, details.profession, details.family_details
        ));
    }
    card
}

fn show_top(swipe: &SwipeSession) {
    match swipe.current() {
        Some(profile) => println!(
            "[{}/{}] {}",
            swipe.deck().cursor() + 1,
            swipe.deck().len(),
            render_card(profile)
        ),
        None => println!("No more profiles to show. Type 'refresh' to reload."),
    }
}

fn prompt(label: &str) {
    print!("{label}");
    let _ = std::io::stdout().flush();
}

/// Next input line, or `None` at end of input or once `cancel` fires.
async fn next_line<R>(lines: &mut Lines<R>, cancel: &CancellationToken) -> Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Ok(None),
        line = lines.next_line() => Ok(line?),
    }
}

pub async fn run_swipe<R>(mut swipe: SwipeSession, input: R) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    match swipe.refresh().await {
        Ok(_) => {}
        Err(ApiError::Cancelled) => return Ok(()),
        Err(e) => println!("could not load profiles: {e}"),
    }
    println!("{SWIPE_HELP}");
    println!("advance policy: {}", swipe.policy().as_str());
    show_top(&swipe);

    let cancel = swipe.cancellation_token();
    let mut lines = input.lines();
    loop {
        prompt("> ");
        let Some(line) = next_line(&mut lines, &cancel).await? else {
            break;
        };

        let command = match parse_swipe_command(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                println!("{e}\n{SWIPE_HELP}");
                continue;
            }
        };

        let outcome = match command {
            SwipeCommand::Quit => break,
            SwipeCommand::Help => {
                println!("{SWIPE_HELP}");
                continue;
            }
            SwipeCommand::Refresh => {
                match swipe.refresh().await {
                    Ok(n) => println!("loaded {n} profiles"),
                    Err(ApiError::Cancelled) => break,
                    Err(e) => println!("could not load profiles: {e}"),
                }
                show_top(&swipe);
                continue;
            }
            SwipeCommand::Press(kind) => swipe.press(kind).await,
            SwipeCommand::Drag(d) => {
                swipe.drag(d);
                swipe.release(d).await
            }
        };

        match outcome {
            SwipeOutcome::Reset => println!("(card returned)"),
            SwipeOutcome::Submitted {
                record,
                acknowledged,
                ..
            } => {
                let note = if acknowledged { "" } else { " (not delivered)" };
                println!("{} {}{note}", record.kind, record.target_user_id);
                show_top(&swipe);
            }
            SwipeOutcome::Busy => println!("(still sending)"),
            SwipeOutcome::Exhausted => show_top(&swipe),
            SwipeOutcome::Cancelled => break,
        }
    }
    Ok(())
}

pub fn print_topics() {
    for topic in SUGGESTED_TOPICS {
        println!("{}. {} - {}", topic.id, topic.title, topic.description);
    }
}

fn speaker(sender: Sender) -> &'static str {
    match sender {
        Sender::User => "you",
        Sender::Bot => "bot",
    }
}

pub async fn run_chat<R>(chat: ChatSession, input: R) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    for message in chat.transcript().await {
        println!("{}: {}", speaker(message.sender), message.text);
    }
    println!("Suggested topics:");
    print_topics();

    let cancel = chat.cancellation_token();
    let mut lines = input.lines();
    loop {
        prompt("you: ");
        let Some(line) = next_line(&mut lines, &cancel).await? else {
            break;
        };
        if matches!(line.trim(), "/quit" | "/exit") {
            break;
        }
        if let Some(reply) = chat.send(&line).await {
            println!("{}: {}", speaker(reply.sender), reply.text);
        } else if cancel.is_cancelled() {
            break;
        }
    }
    Ok(())
}
