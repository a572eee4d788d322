use std::sync::Arc;

use futures::StreamExt;
use futures::stream;
use tokio::io::{AsyncBufReadExt, BufReader};

use symptom_intake::backend::HttpBackend;
use symptom_intake::engine::{Action, IntakeEngine};
use symptom_intake::followup::{FollowUpInput, FollowUpPanel};
use symptom_intake::results::{ANALYSIS_FAILED_MESSAGE, AnalysisPanel};
use symptom_intake::session::FollowUpAnswer;
use symptom_intake::view::{Presenter, ViewModel};
use symptom_intake::wizard::Step;
use symptom_intake::IntakeConfig;

const HELP: &str = "\
Commands:
  sex <male|female>            age <years>
  history <key> <yes|no|?>     type <text>
  pick <n|name>                remove <name>
  answer <value | a, b, c>     next | back | goto <1-6>
  help | quit";

/// Renders each view to stdout.
struct TerminalPresenter {
    last: Option<ViewModel>,
}

impl Presenter for TerminalPresenter {
    fn render(&mut self, view: &ViewModel) {
        if self.last.as_ref() == Some(view) {
            return;
        }
        print!("{}", render_view(view));
        self.last = Some(view.clone());
    }
}

fn render_view(view: &ViewModel) -> String {
    let mut out = String::new();
    let crumbs: Vec<String> = view
        .steps
        .iter()
        .map(|s| {
            if s.active {
                format!("[{}. {}]", s.step.number(), s.title)
            } else {
                format!("{}. {}", s.step.number(), s.title)
            }
        })
        .collect();
    out.push_str(&format!("\n{}\n", crumbs.join("  ")));

    if let Some(notice) = &view.notice {
        out.push_str(&format!("! {notice}\n"));
    }

    match view.active_step {
        Step::Sex => {
            let current = view.demographics.gender.map(|g| g.to_string());
            out.push_str(&format!(
                "Biological sex: {}\n",
                current.as_deref().unwrap_or("(not selected)")
            ));
        }
        Step::Age => {
            let current = view.demographics.age.map(|a| a.to_string());
            out.push_str(&format!("Age: {}\n", current.as_deref().unwrap_or("(not entered)")));
        }
        Step::History => {
            for q in &view.history {
                let options: Vec<String> = q
                    .options
                    .iter()
                    .map(|o| {
                        if q.selected == Some(*o) {
                            format!("({o})")
                        } else {
                            o.to_string()
                        }
                    })
                    .collect();
                out.push_str(&format!("  {:<13} {}\n    {}\n", q.key, q.text, options.join(" / ")));
            }
        }
        Step::Symptoms => {
            out.push_str(&format!("Search: {}\n", view.query));
            if let Some(message) = view.suggestions.message() {
                out.push_str(&format!("  {message}\n"));
            }
            for (i, s) in view.suggestions.items().iter().enumerate() {
                out.push_str(&format!("  {}. {s}\n", i + 1));
            }
            out.push_str(&format!("Selected: {}\n", view.selected_symptoms.join(", ")));
        }
        Step::FollowUp => match &view.follow_up {
            FollowUpPanel::Idle => out.push_str("No follow-up questions.\n"),
            FollowUpPanel::Waiting => out.push_str("Preparing the next question...\n"),
            FollowUpPanel::Stalled => out.push_str("Could not load the next question.\n"),
            FollowUpPanel::Asking(prompt) => {
                out.push_str(&format!("{}\n", prompt.question));
                match &prompt.input {
                    FollowUpInput::Scale { min, max, default } => {
                        out.push_str(&format!("  answer {min}-{max} (default {default})\n"))
                    }
                    FollowUpInput::MultiSelect { options } => {
                        out.push_str(&format!("  answer any of: {}\n", options.join(", ")))
                    }
                    FollowUpInput::FreeText => out.push_str("  answer <text>\n"),
                }
            }
        },
        Step::Results => match &view.analysis {
            AnalysisPanel::Idle => {}
            AnalysisPanel::Loading => out.push_str("Analyzing symptoms...\n"),
            AnalysisPanel::Failed => out.push_str(&format!("{ANALYSIS_FAILED_MESSAGE}\n")),
            AnalysisPanel::Ready(display) => out.push_str(&display.to_string()),
        },
    }

    let mut controls = Vec::new();
    if view.navigation.show_back {
        controls.push("back".to_string());
    }
    if view.navigation.show_next {
        controls.push(format!("next ({})", view.navigation.next_label));
    }
    if !controls.is_empty() {
        out.push_str(&format!("> {}\n", controls.join(" | ")));
    }
    out
}

/// What a typed line asks for.
#[derive(Debug, PartialEq, Eq)]
enum Command {
    Act(Action),
    PickIndex(usize),
    Answer(String),
    Help,
    Quit,
}

fn parse_command(line: &str) -> Result<Command, String> {
    let line = line.trim();
    let (verb, rest) = line.split_once(' ').unwrap_or((line, ""));
    let rest = rest.trim();

    let command = match verb.to_lowercase().as_str() {
        "sex" | "gender" => Command::Act(Action::SelectGender(rest.parse()?)),
        "age" => {
            let age = rest.parse::<i32>().map_err(|_| format!("not a number: '{rest}'"))?;
            Command::Act(Action::EnterAge(age))
        }
        "history" => {
            let (key, answer) = rest
                .split_once(' ')
                .ok_or_else(|| "usage: history <key> <yes|no|?>".to_string())?;
            Command::Act(Action::AnswerHistory(key.parse()?, answer.parse()?))
        }
        "type" => Command::Act(Action::TypeQuery(rest.to_string())),
        "pick" => match rest.parse::<usize>() {
            Ok(n) => Command::PickIndex(n),
            Err(_) if !rest.is_empty() => Command::Act(Action::PickSuggestion(rest.to_string())),
            Err(_) => return Err("usage: pick <n|name>".to_string()),
        },
        "remove" => Command::Act(Action::RemoveSymptom(rest.to_string())),
        "close" => Command::Act(Action::DismissSuggestions),
        "answer" => Command::Answer(rest.to_string()),
        "next" => Command::Act(Action::Next),
        "back" => Command::Act(Action::Back),
        "goto" => {
            let step = rest
                .parse::<u8>()
                .ok()
                .and_then(Step::from_number)
                .ok_or_else(|| format!("no such step: '{rest}'"))?;
            Command::Act(Action::JumpTo(step))
        }
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => return Err(format!("unknown command '{other}' (try 'help')")),
    };
    Ok(command)
}

/// Shape a typed answer for the question on screen.
fn follow_up_answer(input: Option<&FollowUpInput>, raw: &str) -> FollowUpAnswer {
    match input {
        Some(FollowUpInput::Scale { default, .. }) => {
            FollowUpAnswer::Scale(raw.trim().parse().unwrap_or(*default))
        }
        Some(FollowUpInput::MultiSelect { .. }) => FollowUpAnswer::Choices(
            raw.split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
        ),
        _ => FollowUpAnswer::Text(raw.to_string()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = IntakeConfig::from_env()?;

    eprintln!("Symptom intake v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Backend: {}", config.backend_url);
    eprintln!("   Debounce: {}ms", config.debounce.as_millis());
    match config.max_followup_rounds {
        Some(max) => eprintln!("   Follow-up rounds: at most {max}"),
        None => eprintln!("   Follow-up rounds: until the backend completes"),
    }
    eprintln!("   Type 'help' for commands.\n");

    let backend = Arc::new(HttpBackend::from_config(&config));
    let engine = IntakeEngine::new(config, backend);

    // The engine runs on its own task; this task translates stdin into actions.
    // Pick-by-number and answer shaping need the latest view, so mirror it.
    let (view_tx, view_rx) = tokio::sync::watch::channel(engine.view());
    let engine = engine.with_presenter(MirrorPresenter {
        inner: TerminalPresenter { last: None },
        tx: view_tx,
    });

    let (action_tx, action_rx) = tokio::sync::mpsc::unbounded_channel();
    let engine_task = tokio::spawn(engine.run(action_rx));

    let lines = BufReader::new(tokio::io::stdin()).lines();
    let mut lines = Box::pin(stream::unfold(lines, |mut lines| async move {
        match lines.next_line().await {
            Ok(Some(line)) => Some((line, lines)),
            Ok(None) => None,
            Err(e) => {
                tracing::error!("Error reading stdin: {}", e);
                None
            }
        }
    }));

    while let Some(line) = lines.next().await {
        if line.trim().is_empty() {
            continue;
        }
        let action = match parse_command(&line) {
            Ok(Command::Act(action)) => action,
            Ok(Command::PickIndex(n)) => {
                let view = view_rx.borrow().clone();
                match n.checked_sub(1).and_then(|i| view.suggestions.items().get(i)) {
                    Some(name) => Action::PickSuggestion(name.clone()),
                    None => {
                        eprintln!("no suggestion #{n}");
                        continue;
                    }
                }
            }
            Ok(Command::Answer(raw)) => {
                let view = view_rx.borrow().clone();
                let input = match &view.follow_up {
                    FollowUpPanel::Asking(prompt) => Some(&prompt.input),
                    _ => None,
                };
                Action::AnswerFollowUp(follow_up_answer(input, &raw))
            }
            Ok(Command::Help) => {
                println!("{HELP}");
                continue;
            }
            Ok(Command::Quit) => break,
            Err(e) => {
                eprintln!("{e}");
                continue;
            }
        };
        if action_tx.send(action).is_err() {
            break;
        }
    }

    drop(action_tx);
    let session = engine_task.await?;
    println!("{}", serde_json::to_string_pretty(&session)?);
    Ok(())
}

/// Forwards to the terminal and publishes the view for the input loop.
struct MirrorPresenter {
    inner: TerminalPresenter,
    tx: tokio::sync::watch::Sender<ViewModel>,
}

impl Presenter for MirrorPresenter {
    fn render(&mut self, view: &ViewModel) {
        self.inner.render(view);
        let _ = self.tx.send(view.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use symptom_intake::session::{Gender, HistoryAnswer, HistoryKey};

    #[test]
    fn parses_navigation_and_entry() {
        assert_eq!(parse_command("next").unwrap(), Command::Act(Action::Next));
        assert_eq!(
            parse_command("sex Female").unwrap(),
            Command::Act(Action::SelectGender(Gender::Female))
        );
        assert_eq!(parse_command("age 34").unwrap(), Command::Act(Action::EnterAge(34)));
        assert_eq!(
            parse_command("history smoking no").unwrap(),
            Command::Act(Action::AnswerHistory(HistoryKey::Smoking, HistoryAnswer::No))
        );
        assert_eq!(
            parse_command("goto 3").unwrap(),
            Command::Act(Action::JumpTo(Step::History))
        );
        assert_eq!(parse_command("pick 2").unwrap(), Command::PickIndex(2));
        assert_eq!(
            parse_command("pick sore throat").unwrap(),
            Command::Act(Action::PickSuggestion("sore throat".into()))
        );
    }

    #[test]
    fn rejects_bad_input() {
        assert!(parse_command("goto 9").is_err());
        assert!(parse_command("age old").is_err());
        assert!(parse_command("dance").is_err());
        assert!(parse_command("history smoking").is_err());
    }

    #[test]
    fn answers_follow_the_control() {
        let scale = FollowUpInput::Scale { min: 1, max: 10, default: 5 };
        assert_eq!(follow_up_answer(Some(&scale), "8"), FollowUpAnswer::Scale(8));
        assert_eq!(follow_up_answer(Some(&scale), ""), FollowUpAnswer::Scale(5));

        let multi = FollowUpInput::MultiSelect { options: vec![] };
        assert_eq!(
            follow_up_answer(Some(&multi), "Head, Neck,"),
            FollowUpAnswer::Choices(vec!["Head".into(), "Neck".into()])
        );
        assert_eq!(follow_up_answer(None, "fine"), FollowUpAnswer::Text("fine".into()));
    }
}
