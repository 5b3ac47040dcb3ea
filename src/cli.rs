//! Terminal front end: turns typed lines into actions and views into text.

use std::sync::LazyLock;

use regex::Regex;

use crate::app::{MessageView, Screen, UserAction, ViewState};
use crate::profile::{Answer, Question, QuestionKind};
use crate::stage::Stage;

pub const HELP: &str = "Commands: /back /goto <stage> /new /edit /export /restart /help /quit";

static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").expect("tag pattern"));

/// What a line of input asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Actions(Vec<UserAction>),
    Help,
    Quit,
}

/// Interpret `line` in the context of the screen currently shown.
pub fn parse_input(line: &str, view: &ViewState) -> Result<Command, String> {
    let line = line.trim();

    if let Some(rest) = line.strip_prefix('/') {
        let (cmd, arg) = rest.split_once(' ').unwrap_or((rest, ""));
        let action = match cmd {
            "quit" | "exit" => return Ok(Command::Quit),
            "help" => return Ok(Command::Help),
            "back" => UserAction::Back,
            "new" => UserAction::NewConversation,
            "edit" => UserAction::EditProfile,
            "export" => UserAction::ExportHistory,
            "restart" => UserAction::Restart,
            "goto" => {
                let stage: Stage = arg.trim().parse().map_err(|e| format!("{e}"))?;
                UserAction::GoTo(stage)
            }
            other => return Err(format!("Unknown command /{other}. {HELP}")),
        };
        return Ok(Command::Actions(vec![action]));
    }

    let actions = match &view.screen {
        Screen::Welcome { .. } if line.is_empty() => vec![UserAction::Start],
        Screen::Welcome { .. } => vec![UserAction::SetName(line.to_string()), UserAction::Start],
        Screen::Onboarding { question: None, .. } => vec![UserAction::Back],
        Screen::Onboarding { .. } if line.is_empty() => vec![UserAction::Next],
        Screen::Onboarding {
            question: Some(question),
            ..
        } => vec![
            UserAction::SelectAnswer {
                question_id: question.id.clone(),
                answer: parse_choice(line, question)?,
            },
            UserAction::Next,
        ],
        Screen::Summary { .. } => match line.to_lowercase().as_str() {
            "" | "y" | "yes" => vec![UserAction::ConfirmProfile],
            "n" | "no" | "edit" => vec![UserAction::EditProfile],
            _ => return Err("Answer yes to start chatting or no to edit.".to_string()),
        },
        Screen::Chatting { .. } if line.is_empty() => vec![],
        Screen::Chatting { .. } => vec![UserAction::SendMessage(line.to_string())],
    };
    Ok(Command::Actions(actions))
}

/// Parse a comma-separated list of 1-based option numbers.
fn parse_choice(line: &str, question: &Question) -> Result<Answer, String> {
    let mut picked = Vec::new();
    for part in line.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let n: usize = part
            .parse()
            .map_err(|_| format!("'{part}' is not an option number"))?;
        let option = n
            .checked_sub(1)
            .and_then(|i| question.options.get(i))
            .ok_or_else(|| format!("Pick a number between 1 and {}", question.options.len()))?;
        picked.push(option.clone());
    }

    match question.kind {
        QuestionKind::SingleSelect => match picked.as_slice() {
            [one] => Ok(Answer::single(one.clone())),
            _ => Err("Pick exactly one option".to_string()),
        },
        QuestionKind::MultiSelect => Ok(Answer::multi(picked)),
    }
}

/// Text for the screen in `view`.
pub fn render(view: &ViewState) -> String {
    match &view.screen {
        Screen::Welcome { name } => {
            let mut out = String::from("Welcome to your fitness coach!\n");
            if name.is_empty() {
                out.push_str("What's your name? (Enter to skip)");
            } else {
                out.push_str(&format!("Press Enter to continue as {name}, or type a new name."));
            }
            out
        }
        Screen::Onboarding {
            question: Some(question),
            selected,
            progress,
        } => {
            let mut out = format!(
                "[{}/{} · {}%] {}\n",
                progress.current_index + 1,
                progress.total,
                progress.percent,
                question.prompt
            );
            for (i, option) in question.options.iter().enumerate() {
                let mark = if selected.contains(option) { "x" } else { " " };
                out.push_str(&format!("  [{mark}] {}. {option}\n", i + 1));
            }
            out.push_str(match question.kind {
                QuestionKind::SingleSelect => "Pick one number.",
                QuestionKind::MultiSelect => "Pick one or more numbers, separated by commas.",
            });
            out
        }
        Screen::Onboarding { question: None, .. } => {
            "All questions answered. Press Enter to review them.".to_string()
        }
        Screen::Summary { summary, complete } => {
            if *complete {
                format!("Your profile:\n{summary}\n\nStart chatting? (yes/no)")
            } else {
                format!("{summary}\n\nStart chatting anyway? (yes/no)")
            }
        }
        Screen::Chatting { messages, .. } => messages
            .iter()
            .map(render_message)
            .collect::<Vec<_>>()
            .join("\n\n"),
    }
}

/// One transcript entry as plain text.
pub fn render_message(message: &MessageView) -> String {
    let text = message.html.replace("<br>", "\n");
    format!("{}: {}", message.role.label(), TAG.replace_all(&text, ""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::Role;
    use crate::profile::{Progress, QuestionSet};

    fn onboarding(question_id: &str) -> ViewState {
        let question = QuestionSet::fitness().get(question_id).cloned();
        ViewState {
            stage: Stage::Onboarding,
            navigable: vec![Stage::Welcome],
            screen: Screen::Onboarding {
                question,
                selected: vec![],
                progress: Progress {
                    current_index: 0,
                    total: 4,
                    percent: 0,
                    can_go_back: false,
                    can_go_next: false,
                },
            },
        }
    }

    fn screen(stage: Stage, screen: Screen) -> ViewState {
        ViewState {
            stage,
            navigable: vec![],
            screen,
        }
    }

    #[test]
    fn slash_commands() {
        let view = onboarding("goals");
        assert_eq!(parse_input("/quit", &view), Ok(Command::Quit));
        assert_eq!(
            parse_input("/back", &view),
            Ok(Command::Actions(vec![UserAction::Back]))
        );
        assert_eq!(
            parse_input("/goto Summary", &view),
            Ok(Command::Actions(vec![UserAction::GoTo(Stage::Summary)]))
        );
        assert!(parse_input("/goto nowhere", &view).is_err());
        assert!(parse_input("/dance", &view).unwrap_err().contains("/dance"));
    }

    #[test]
    fn welcome_name_then_start() {
        let view = screen(
            Stage::Welcome,
            Screen::Welcome {
                name: String::new(),
            },
        );
        assert_eq!(
            parse_input(" Sam ", &view),
            Ok(Command::Actions(vec![
                UserAction::SetName("Sam".into()),
                UserAction::Start
            ]))
        );
        assert_eq!(
            parse_input("", &view),
            Ok(Command::Actions(vec![UserAction::Start]))
        );
    }

    #[test]
    fn multi_select_numbers() {
        let view = onboarding("goals");
        let Ok(Command::Actions(actions)) = parse_input("3, 1", &view) else {
            panic!("expected actions");
        };
        assert_eq!(
            actions,
            vec![
                UserAction::SelectAnswer {
                    question_id: "goals".into(),
                    answer: Answer::multi(["Improve endurance", "Build muscle"]),
                },
                UserAction::Next,
            ]
        );
    }

    #[test]
    fn single_select_takes_one_number() {
        let view = onboarding("level");
        assert!(parse_input("1,2", &view).is_err());
        assert!(parse_input("9", &view).unwrap_err().contains("between 1 and 3"));
        assert!(parse_input("zero", &view).is_err());
        let Ok(Command::Actions(actions)) = parse_input("2", &view) else {
            panic!("expected actions");
        };
        assert_eq!(
            actions[0],
            UserAction::SelectAnswer {
                question_id: "level".into(),
                answer: Answer::single("Intermediate"),
            }
        );
    }

    #[test]
    fn summary_confirmation() {
        let view = screen(
            Stage::Summary,
            Screen::Summary {
                summary: "Name: Sam".into(),
                complete: true,
            },
        );
        assert_eq!(
            parse_input("YES", &view),
            Ok(Command::Actions(vec![UserAction::ConfirmProfile]))
        );
        assert_eq!(
            parse_input("no", &view),
            Ok(Command::Actions(vec![UserAction::EditProfile]))
        );
        assert!(parse_input("maybe", &view).is_err());
    }

    #[test]
    fn chat_lines_are_messages() {
        let view = screen(
            Stage::Chatting,
            Screen::Chatting {
                messages: vec![],
                busy: false,
            },
        );
        assert_eq!(
            parse_input("leg day?", &view),
            Ok(Command::Actions(vec![UserAction::SendMessage(
                "leg day?".into()
            )]))
        );
        assert_eq!(parse_input("   ", &view), Ok(Command::Actions(vec![])));
    }

    #[test]
    fn renders_question_with_selection() {
        let mut view = onboarding("level");
        if let Screen::Onboarding { selected, .. } = &mut view.screen {
            selected.push("Advanced".into());
        }
        let text = render(&view);
        assert!(text.starts_with("[1/4 · 0%]"));
        assert!(text.contains("[ ] 1. Beginner"));
        assert!(text.contains("[x] 3. Advanced"));
        assert!(text.ends_with("Pick one number."));
    }

    #[test]
    fn message_markup_is_stripped() {
        let view = MessageView {
            id: 2,
            role: Role::Assistant,
            html: "<strong>Day 1:</strong> Squats<br><span class=\"list-bullet\">•</span> 3 sets"
                .into(),
        };
        assert_eq!(render_message(&view), "ASSISTANT: Day 1: Squats\n• 3 sets");
    }
}
