//! Console output for practice sessions and saved progress.

use std::fmt::Write as _;

use rehearse_core::{Phase, PracticeState, ProgressSnapshot, Script};

/// What to print when the session moves from `previous` to `current`.
///
/// Returns `None` when nothing the user needs to see changed.
pub fn describe_transition(
    previous: Option<&PracticeState>,
    current: &PracticeState,
    character: &str,
) -> Option<String> {
    let phase_changed = previous.is_none_or(|p| p.phase != current.phase);
    let line_changed = previous.is_none_or(|p| p.current_line_index != current.current_line_index);
    let mode_changed = previous.is_some_and(|p| p.mode != current.mode);

    if mode_changed {
        return Some(format!("  (mode: {})", current.mode));
    }
    if !phase_changed && !line_changed {
        return None;
    }

    let number = current.current_line_index + 1;
    match current.phase {
        Phase::AwaitingUserSpeech if current.countdown > 0 => Some(format!(
            "\n[{number}] {character}, your line ({}s to begin):",
            current.countdown
        )),
        Phase::AwaitingUserSpeech => Some(format!(
            "\n[{number}] {character}, your line (type it, or :next to move on):"
        )),
        Phase::ShowingResult => current
            .result_accuracy
            .map(|accuracy| format!("  -> {accuracy}%")),
        Phase::Paused => Some(format!("  paused at line {number} (:resume to continue)")),
        Phase::Idle if previous.is_some_and(|p| p.playing) || line_changed => {
            Some(format!("  at line {number} (:next, :prev, :start)"))
        }
        Phase::Idle | Phase::PlayingPartnerLine | Phase::Complete => None,
    }
}

/// Per-line scores for `character` plus the completion ratio.
pub fn format_summary(
    script: &Script,
    character: &str,
    snapshot: &ProgressSnapshot,
) -> String {
    let own = script.indices_for(character);
    let mut out = format!("\n{} as {}\n", script.id(), character);

    for index in &own {
        let text = script.line(*index).map_or("", |l| l.text.as_str());
        let score = snapshot
            .accuracy_scores
            .get(index)
            .map_or_else(|| "  -".to_string(), |s| format!("{s:>3}"));
        let mark = if snapshot.completed_lines.contains(index) {
            '*'
        } else {
            ' '
        };
        let _ = writeln!(out, "  {:>4} {score}% {mark} {}", index + 1, preview(text, 50));
    }

    let completed = own
        .iter()
        .filter(|i| snapshot.completed_lines.contains(i))
        .count();
    let _ = write!(
        out,
        "\nCompleted {completed}/{} lines ({}%)",
        own.len(),
        percent(completed, own.len())
    );
    out
}

/// Saved progress without the script text.
pub fn format_progress(snapshot: &ProgressSnapshot) -> String {
    let mut out = format!(
        "{} as {}\n  last position: act {}, scene {}, line {}\n  updated: {}\n",
        snapshot.script_id,
        snapshot.character,
        snapshot.last_act_number,
        snapshot.last_scene_number,
        snapshot.last_line_index + 1,
        snapshot.updated_at.format("%Y-%m-%d %H:%M UTC"),
    );
    if snapshot.accuracy_scores.is_empty() {
        out.push_str("  no lines scored yet");
        return out;
    }

    let average = snapshot
        .accuracy_scores
        .values()
        .map(|s| usize::from(*s))
        .sum::<usize>()
        / snapshot.accuracy_scores.len();
    let _ = write!(
        out,
        "  scored {} lines, {} completed, average {average}%",
        snapshot.accuracy_scores.len(),
        snapshot.completed_lines.len(),
    );
    out
}

fn percent(part: usize, whole: usize) -> usize {
    if whole == 0 { 0 } else { part * 100 / whole }
}

fn preview(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{}...", cut.trim_end())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::{TimeZone, Utc};
    use rehearse_core::{PracticeMode, ScriptLine, Speaker};

    use super::*;

    fn script() -> Script {
        let lines = [
            ("HORATIO", "Hail to your lordship!"),
            ("HAMLET", "I am glad to see you well."),
            ("HORATIO", "The same, my lord, and your poor servant ever."),
            ("HAMLET", "Sir, my good friend; I'll change that name with you."),
        ]
        .into_iter()
        .enumerate()
        .map(|(index, (who, text))| ScriptLine {
            id: format!("l{index}"),
            character: Speaker::One(who.into()),
            text: text.into(),
            index,
            act_number: 1,
            scene_number: 2,
        })
        .collect();
        Script::new("Hamlet", lines).unwrap()
    }

    fn snapshot(scores: &[(usize, u8)], completed: &[usize]) -> ProgressSnapshot {
        ProgressSnapshot {
            script_id: "Hamlet".into(),
            character: "HAMLET".into(),
            last_act_number: 1,
            last_scene_number: 2,
            last_line_index: 3,
            completed_lines: completed.to_vec(),
            accuracy_scores: scores.iter().copied().collect::<BTreeMap<_, _>>(),
            updated_at: Utc.with_ymd_and_hms(2026, 3, 1, 19, 30, 0).unwrap(),
        }
    }

    #[test]
    fn summary_lists_own_lines_and_ratio() {
        let summary = format_summary(&script(), "HAMLET", &snapshot(&[(1, 92), (3, 40)], &[1]));
        assert!(summary.contains("   2  92% * I am glad to see you well."));
        assert!(summary.contains("   4  40%   Sir, my good friend;"));
        assert!(!summary.contains("Hail to your lordship"));
        assert!(summary.ends_with("Completed 1/2 lines (50%)"));
    }

    #[test]
    fn unscored_lines_show_a_dash() {
        let summary = format_summary(&script(), "HAMLET", &snapshot(&[], &[]));
        assert!(summary.contains("   2   -%"));
        assert!(summary.ends_with("Completed 0/2 lines (0%)"));
    }

    #[test]
    fn progress_reports_position_and_average() {
        let text = format_progress(&snapshot(&[(1, 90), (3, 60)], &[1]));
        assert!(text.contains("act 1, scene 2, line 4"));
        assert!(text.contains("2026-03-01 19:30 UTC"));
        assert!(text.contains("scored 2 lines, 1 completed, average 75%"));

        let empty = format_progress(&snapshot(&[], &[]));
        assert!(empty.ends_with("no lines scored yet"));
    }

    #[test]
    fn transition_prompts_for_user_line() {
        let idle = PracticeState::new(1, PracticeMode::Auto);
        let mut waiting = idle.clone();
        waiting.phase = Phase::AwaitingUserSpeech;
        waiting.countdown = 8;

        let text = describe_transition(Some(&idle), &waiting, "HAMLET").unwrap();
        assert!(text.contains("[2] HAMLET, your line (8s to begin)"));

        // Countdown ticks alone print nothing.
        let mut tick = waiting.clone();
        tick.countdown = 7;
        assert_eq!(describe_transition(Some(&waiting), &tick, "HAMLET"), None);
    }

    #[test]
    fn transition_shows_result() {
        let mut waiting = PracticeState::new(1, PracticeMode::Auto);
        waiting.phase = Phase::AwaitingUserSpeech;
        let mut result = waiting.clone();
        result.phase = Phase::ShowingResult;
        result.result_accuracy = Some(85);

        assert_eq!(
            describe_transition(Some(&waiting), &result, "HAMLET").as_deref(),
            Some("  -> 85%")
        );
    }

    #[test]
    fn long_lines_are_shortened() {
        assert_eq!(preview("short", 10), "short");
        assert_eq!(preview("a rather long line of verse", 12), "a rather...");
    }
}
