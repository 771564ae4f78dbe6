//! Command-line front end for the echotune control surface.
//!
//! Examples:
//!   echotune-cli filter 4 "Frosty Resolve" "" crit_rate
//!   echotune-cli scan
//!   echotune-cli coef crit_rate 2
//!   echotune-cli target crit_rate 6.3
//!   echotune-cli defaults
//!   echotune-cli apply
//!   echotune-cli run
//!   echotune-cli render schedule schedule.svg
//!
//! By default it talks to the service configured in config.json (or
//! ECHOTUNE_API_BASE); override with `--api http://host:port`.

use std::fmt::Display;
use std::process;

use echotune::discard::{BRACKET_LABELS, BRACKET_START_LEVELS};
use echotune::history::HistorySortKey;
use echotune::model::format_wasted;
use echotune::prelude::*;
use echotune::session::ExampleLookup;

type Panel = ControlPanel<HttpAnalysisService, DisplayList>;

fn usage() -> ! {
    eprintln!("echotune-cli (talks to the analysis service @ 127.0.0.1:8000 by default)");
    eprintln!("Usage: echotune-cli [--api URL] <command> [args]\n");
    eprintln!("Commands:");
    eprintln!("  filter <cost> [suit] [echo] [main_entry]  Apply the service-side item filter");
    eprintln!("  scan                        Scan candidates and analyse them");
    eprintln!("  coef <key> <value>          Set a scoring coefficient (0 removes it)");
    eprintln!("  target <key> <value>        Set a target entry value (0 removes it)");
    eprintln!("  lock <key,...>              Set the locked entry keys");
    eprintln!("  brief                       Brief analysis of the scoring inputs");
    eprintln!("  defaults                    Set every threshold to brief probability +10%");
    eprintln!("  set-schedule v0 v1 v2 v3    Set thresholds, in percent");
    eprintln!("  set-weight <a|b|c> <value>  Set one resource weight (fraction)");
    eprintln!("  optimal                     Ask the optimizer for a schedule");
    eprintln!("  apply                       Analyse the current schedule");
    eprintln!("  example <0-3>               Example item for a bracket row");
    eprintln!("  history [a|b]               List history sorted by exp (a) or tuner (b)");
    eprintln!("  restore <id>                Restore a history entry's schedule");
    eprintln!("  run                         Run the automation loop (Ctrl-C stops)");
    eprintln!("  render <schedule|weights> <out.svg>  Export a chart");
    eprintln!("  show                        Print the session");
    eprintln!("  paths                       Show config and session file paths");
    process::exit(1);
}

fn fail(msg: impl Display) -> ! {
    eprintln!("{msg}");
    process::exit(1);
}

fn parse_args() -> (Option<String>, Vec<String>) {
    let mut args: Vec<String> = std::env::args().skip(1).collect();
    if args.is_empty() {
        usage();
    }

    let mut api = None;
    if args.len() >= 2 && args[0] == "--api" {
        api = Some(args[1].clone());
        args.drain(0..2);
    }

    if args.is_empty() {
        usage();
    }

    (api, args)
}

fn arg<'a>(args: &'a [String], i: usize) -> &'a str {
    args.get(i).map(String::as_str).unwrap_or_else(|| usage())
}

fn number<T: std::str::FromStr>(s: &str, what: &str) -> T {
    s.parse()
        .unwrap_or_else(|_| fail(format!("{what} must be a number, got '{s}'")))
}

fn print_schedule(s: &SessionState) {
    let cells: Vec<String> = BRACKET_LABELS
        .iter()
        .zip(s.schedule.values())
        .map(|(label, v)| format!("{label}: {:.1}%", v * 100.0))
        .collect();
    println!("schedule  {}", cells.join("  "));
    let w = s.weights.as_array();
    println!(
        "weights   items={:.1}% exp={:.1}% tuner={:.1}%",
        w[0] * 100.0,
        w[1] * 100.0,
        w[2] * 100.0
    );
}

fn print_analysis(a: &Analysis) {
    println!(
        "prob={:.2}% prob_with_discard={:.2}% wasted_exp={} wasted_tuner={}",
        a.prob_above_threshold * 100.0,
        a.prob_above_threshold_with_discard * 100.0,
        format_wasted(a.wasted_exp),
        format_wasted(a.wasted_tuner),
    );
}

fn print_candidates(s: &SessionState) {
    for i in s.display_order() {
        let c = &s.candidates[i];
        let status = s
            .candidate_status(i)
            .map(|st| format!("{st:?}"))
            .unwrap_or_default();
        let entries: Vec<String> = c
            .profile
            .sorted_entries()
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();
        match c.analysis {
            Some(a) => println!(
                "#{i:<3} +{:<2} {:<10} prob={:.2}% exp={} tuner={}  {}",
                c.level(),
                status,
                a.prob_above_threshold_with_discard * 100.0,
                format_wasted(a.wasted_exp),
                format_wasted(a.wasted_tuner),
                entries.join(" "),
            ),
            None => println!("#{i:<3} +{:<2} {:<10} {}", c.level(), status, entries.join(" ")),
        }
    }
}

fn print_history(s: &SessionState, key: HistorySortKey) {
    for e in s.history.sorted_view(key) {
        let mark = if s.selected_history == Some(e.id) { '*' } else { ' ' };
        let thresholds: Vec<String> = e
            .schedule
            .values()
            .iter()
            .map(|v| format!("{:.1}", v * 100.0))
            .collect();
        println!(
            "{mark}{:<4} [{}] prob={:.2}% exp={} tuner={}",
            e.id,
            thresholds.join(", "),
            e.achieved_probability * 100.0,
            format_wasted(e.wasted_exp),
            format_wasted(e.wasted_tuner),
        );
    }
}

async fn run_automation(panel: &Panel) {
    let run = panel.start_automation();
    tokio::pin!(run);
    let outcome = tokio::select! {
        outcome = &mut run => outcome,
        _ = tokio::signal::ctrl_c() => {
            panel.stop_automation().await;
            run.await
        }
    };
    match outcome {
        RunOutcome::Succeeded => println!("target reached"),
        RunOutcome::Stopped => println!("stopped"),
        RunOutcome::Exhausted => fail("no candidate left to advance"),
        RunOutcome::Failed(e) => fail(format!("automation failed: {e}")),
        RunOutcome::NotReady => fail("apply a filter and scan first"),
        RunOutcome::AlreadyRunning => println!("already running; stop requested"),
    }
}

async fn dispatch(panel: &Panel, args: &[String]) {
    match args[0].as_str() {
        "filter" => {
            let filter = FilterSelection {
                cost: number(arg(args, 1), "cost"),
                suit: args.get(2).cloned().unwrap_or_default(),
                echo: args.get(3).cloned().unwrap_or_default(),
                main_entry: args.get(4).cloned().unwrap_or_default(),
            };
            match panel.apply_filter(filter).await {
                Ok(()) => println!("filter applied"),
                Err(e) => fail(format!("filter failed: {e}")),
            }
        }
        "scan" => {
            let n = panel
                .scan()
                .await
                .unwrap_or_else(|e| fail(format!("scan failed: {e}")));
            println!("{n} candidates");
            print_candidates(&*panel.session().read().await);
        }
        "coef" => {
            panel
                .set_coef(arg(args, 1), number(arg(args, 2), "coefficient"))
                .await;
        }
        "target" => {
            panel
                .set_target(arg(args, 1), number(arg(args, 2), "target"))
                .await;
        }
        "lock" => {
            let keys = arg(args, 1)
                .split(',')
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(str::to_string)
                .collect();
            panel.set_locked_keys(keys).await;
        }
        "brief" => match panel.refresh_brief().await {
            Ok(Some(b)) => println!(
                "expected_score={:.2} prob={:.2}%",
                b.expected_score,
                b.prob_above_threshold * 100.0
            ),
            Ok(None) => fail("too many target entries (at most 5)"),
            Err(e) => fail(format!("brief analysis failed: {e}")),
        },
        "defaults" => {
            if panel.session().read().await.brief.is_none() {
                let _ = panel.refresh_brief().await;
            }
            if !panel.apply_defaults().await {
                fail("no brief analysis available");
            }
            print_schedule(&*panel.session().read().await);
        }
        "set-schedule" => {
            let mut values = [0.0; BRACKETS];
            for (i, v) in values.iter_mut().enumerate() {
                *v = number::<f64>(arg(args, i + 1), "threshold") / 100.0;
            }
            panel.set_schedule(values).await;
            print_schedule(&*panel.session().read().await);
        }
        "set-weight" => {
            let slot = WeightSlot::parse(arg(args, 1)).unwrap_or_else(|| usage());
            panel
                .weight_slider(slot, number(arg(args, 2), "weight"))
                .await;
            print_schedule(&*panel.session().read().await);
        }
        "optimal" => {
            if let Err(e) = panel.apply_optimal().await {
                fail(format!("optimizer failed: {e}"));
            }
            print_schedule(&*panel.session().read().await);
        }
        "apply" => match panel.apply_schedule().await {
            Ok(a) => {
                print_analysis(&a);
                print_candidates(&*panel.session().read().await);
            }
            Err(e) => fail(format!("apply failed: {e}")),
        },
        "example" => {
            let bracket: usize = number(arg(args, 1), "bracket");
            match panel.lookup_example(bracket).await {
                Ok(ExampleLookup::Found { example, .. }) => {
                    println!(
                        "+{} ({}) actual prob={:.2}%",
                        BRACKET_START_LEVELS[bracket],
                        BRACKET_LABELS[bracket],
                        example.actual_prob * 100.0
                    );
                    for (k, v) in example.profile.sorted_entries() {
                        println!("  {k}={v}");
                    }
                }
                Ok(_) => println!("no example found"),
                Err(e) => fail(format!("example lookup failed: {e}")),
            }
        }
        "history" => {
            let key = match args.get(1) {
                Some(k) => HistorySortKey::parse(k).unwrap_or_else(|| usage()),
                None => panel.session().read().await.history_sort,
            };
            let mut s = panel.session().write().await;
            s.history_sort = key;
            print_history(&s, key);
        }
        "restore" => {
            let id: u64 = number(arg(args, 1), "history id");
            if !panel.select_history(id).await {
                fail(format!("no history entry {id}"));
            }
            let s = panel.session().read().await;
            if let Some(e) = s.history.get(id) {
                println!(
                    "prob={:.2}% exp={} tuner={}",
                    e.achieved_probability * 100.0,
                    format_wasted(e.wasted_exp),
                    format_wasted(e.wasted_tuner)
                );
            }
            print_schedule(&s);
            print_candidates(&s);
        }
        "run" => {
            // Filter and scan status is not persisted; redo both from the
            // saved filter so the loop starts from a fresh list.
            if !panel.start_enabled().await {
                let filter = panel.session().read().await.filter.clone();
                if let Err(e) = panel.apply_filter(filter).await {
                    fail(format!("filter failed: {e}"));
                }
                if let Err(e) = panel.scan().await {
                    fail(format!("scan failed: {e}"));
                }
            }
            run_automation(panel).await;
            print_candidates(&*panel.session().read().await);
        }
        "render" => {
            let out = arg(args, 2);
            panel.redraw().await;
            let svg = match arg(args, 1) {
                "schedule" => panel.with_views(|v| v.schedule.surface().to_svg()),
                "weights" => panel.with_views(|v| v.weights.surface().to_svg()),
                _ => usage(),
            };
            if let Err(e) = std::fs::write(out, svg) {
                fail(format!("{out}: {e}"));
            }
            println!("wrote {out}");
        }
        "show" => {
            let s = panel.session().read().await;
            print_schedule(&s);
            println!("score threshold: {:.2}", s.scoring.score_threshold());
            print_candidates(&s);
        }
        _ => usage(),
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let (api, args) = parse_args();
    let paths = AppPaths::new().unwrap_or_else(|e| fail(e));

    if args[0] == "paths" {
        println!("Config file: {}", paths.config_file().display());
        println!("Session file: {}", paths.session_file().display());
        return;
    }

    let mut config = ClientConfig::load_with_env(&paths).unwrap_or_else(|e| fail(e));
    if let Some(api) = api {
        config.api_base = api;
    }
    let service = HttpAnalysisService::new(&config).unwrap_or_else(|e| fail(e));
    let session = SessionState::load(&paths.session_file()).unwrap_or_else(|e| fail(e));

    let panel = ControlPanel::new(
        std::sync::Arc::new(service),
        session,
        config,
        DisplayList::new(600.0, 320.0),
        DisplayList::new(300.0, 300.0),
    );

    dispatch(&panel, &args).await;

    if let Err(e) = paths.ensure_data_dir() {
        fail(e);
    }
    if let Err(e) = panel.session().read().await.save(&paths.session_file()) {
        fail(e);
    };
}
