//! Interactive conflict prompts on stdin.

use std::io::{self, BufRead, Write};

use async_trait::async_trait;
use reqmerge_core::merge::{ConflictType, ItemConflict, MergeResult};
use reqmerge_core::sync::{ConflictResolver, ResolutionOutcome};
use reqmerge_core::{ConflictResolution, ResolutionChoice};
use tracing::warn;

use crate::commands::common::{format_conflict_line, format_conflict_sides};

/// Asks for one choice per conflict on stdin, writing prompts to stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct PromptResolver;

#[async_trait]
impl ConflictResolver for PromptResolver {
    async fn present_conflicts(&self, collection_id: &str, result: &MergeResult) -> ResolutionOutcome {
        let collection_id = collection_id.to_string();
        let conflicts = result.conflicts.clone();
        let prompt = tokio::task::spawn_blocking(move || {
            prompt_for_resolutions(
                &collection_id,
                &conflicts,
                &mut io::stdin().lock(),
                &mut io::stderr(),
            )
        })
        .await;

        match prompt {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(error)) => {
                warn!("Failed to read conflict choices: {error}");
                ResolutionOutcome::Cancelled
            }
            Err(error) => {
                warn!("Conflict prompt task failed: {error}");
                ResolutionOutcome::Cancelled
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Answer {
    Choose(ResolutionChoice),
    Cancel,
}

/// Parse one prompt answer; `keep-both` is refused for delete conflicts.
pub fn parse_answer(input: &str, conflict_type: ConflictType) -> Option<Answer> {
    let answer = match input.trim().to_ascii_lowercase().as_str() {
        "l" | "local" => Answer::Choose(ResolutionChoice::KeepLocal),
        "r" | "remote" => Answer::Choose(ResolutionChoice::KeepRemote),
        "b" | "both" => Answer::Choose(ResolutionChoice::KeepBoth),
        "c" | "cancel" | "q" | "quit" => Answer::Cancel,
        _ => return None,
    };
    match answer {
        Answer::Choose(choice) if !choice.applies_to(conflict_type) => None,
        answer => Some(answer),
    }
}

/// Walk every conflict, reading answers from `input` until each is resolved.
///
/// End of input cancels.
pub fn prompt_for_resolutions(
    collection_id: &str,
    conflicts: &[ItemConflict],
    input: &mut impl BufRead,
    output: &mut impl Write,
) -> io::Result<ResolutionOutcome> {
    writeln!(
        output,
        "{} conflicts while saving {collection_id}",
        conflicts.len()
    )?;

    let mut resolutions = Vec::with_capacity(conflicts.len());
    for conflict in conflicts {
        writeln!(output, "{}", format_conflict_line(conflict))?;
        writeln!(output, "  {}", format_conflict_sides(conflict))?;
        let options = if ResolutionChoice::KeepBoth.applies_to(conflict.conflict_type) {
            "[l]ocal / [r]emote / [b]oth / [c]ancel"
        } else {
            "[l]ocal / [r]emote / [c]ancel"
        };

        loop {
            write!(output, "  {options}: ")?;
            output.flush()?;
            let mut line = String::new();
            if input.read_line(&mut line)? == 0 {
                return Ok(ResolutionOutcome::Cancelled);
            }
            match parse_answer(&line, conflict.conflict_type) {
                Some(Answer::Choose(choice)) => {
                    resolutions.push(ConflictResolution::new(conflict.id.clone(), choice));
                    break;
                }
                Some(Answer::Cancel) => return Ok(ResolutionOutcome::Cancelled),
                None => writeln!(output, "  unrecognized answer {:?}", line.trim())?,
            }
        }
    }

    Ok(ResolutionOutcome::Resolved(resolutions))
}
