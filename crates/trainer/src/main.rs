use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context};
use drill_core::{Board, Catalog, Color, Move, Square};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use trainer::battle::{BattleIgnore, OpponentOutcome, Phase};
use trainer::drill::{DrillSession, FeedbackKind, IgnoreReason};
use trainer::{
    BattleOrchestrator, BattleView, ChatClient, Config, DrillRunner, DrillView, Mode, MoveOutcome,
    PlayerMoveOutcome,
};

const HELP: &str = "\
Commands:
  openings                                  list the opening lines
  drill [id] [learn|practice] [white|black] start drilling a line
  move <from> <to>                          play a move, e.g. move e2 e4
  hint                                      toggle the hint (learn mode)
  jump <n>                                  show the line up to ply n (learn mode)
  reset                                     restart the current drill
  battle <white|black>                      play a game against the opponent
  retry                                     ask the opponent again after a failure
  resign                                    resign the current game
  new                                       start a new game with the same color
  board                                     show the board again
  help                                      show this text
  quit                                      exit";

enum Screen {
    Idle,
    Drill(DrillRunner),
    Battle(BattleOrchestrator<ChatClient>),
}

struct Shell {
    catalog: Catalog,
    config: Config,
    client: Arc<ChatClient>,
    screen: Screen,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let config = Config::from_env();
    let catalog = match &config.openings_path {
        Some(path) => Catalog::load(path).with_context(|| format!("loading openings from {path}"))?,
        None => Catalog::builtin(),
    };
    tracing::info!("Loaded {} opening lines", catalog.len());
    if config.chat_api_key.is_empty() {
        tracing::warn!("CHAT_API_KEY not set - battle mode will not get any moves");
    }
    let client = Arc::new(ChatClient::new(&config).context("building chat client")?);

    let mut shell = Shell {
        catalog,
        config,
        client,
        screen: Screen::Idle,
    };
    println!("{HELP}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let words: Vec<&str> = line.split_whitespace().collect();
        let Some((&command, args)) = words.split_first() else {
            continue;
        };
        if command == "quit" || command == "exit" {
            break;
        }
        if let Err(e) = shell.run(command, args).await {
            println!("Error: {e}");
        }
    }
    Ok(())
}

impl Shell {
    async fn run(&mut self, command: &str, args: &[&str]) -> anyhow::Result<()> {
        match command {
            "help" => println!("{HELP}"),
            "openings" => {
                for opening in self.catalog.iter() {
                    println!(
                        "{:<18} {:<22} {:<6} {}",
                        opening.id,
                        opening.name,
                        opening.color.name(),
                        opening.description
                    );
                }
            }
            "drill" => self.start_drill(args).await?,
            "battle" => self.start_battle(args).await?,
            "move" => {
                let (from, to) = parse_move(args)?;
                self.play(from, to).await?;
            }
            "hint" => {
                let runner = self.drill()?;
                runner.toggle_hint();
                render_drill(&runner.view());
            }
            "jump" => {
                let n: usize = args
                    .first()
                    .context("usage: jump <n>")?
                    .parse()
                    .context("ply must be a number")?;
                let runner = self.drill()?;
                if n == 0 || !runner.jump_to(n - 1) {
                    bail!("cannot jump to ply {n}");
                }
                render_drill(&runner.view());
            }
            "reset" => {
                let runner = self.drill()?;
                runner.reset();
                settle(runner).await;
                render_drill(&runner.view());
            }
            "retry" => {
                let battle = self.battle()?;
                match battle.retry().await {
                    Some(outcome) => report_opponent(&outcome),
                    None => println!("Nothing to retry."),
                }
                render_battle(&battle.snapshot());
            }
            "resign" => {
                let battle = self.battle()?;
                battle.resign();
                render_battle(&battle.snapshot());
            }
            "new" => {
                let battle = self.battle()?;
                battle.new_game();
                if let Some(outcome) = battle.start().await {
                    report_opponent(&outcome);
                }
                render_battle(&battle.snapshot());
            }
            "board" => match &self.screen {
                Screen::Idle => println!("{}", Board::standard().to_diagram()),
                Screen::Drill(runner) => render_drill(&runner.view()),
                Screen::Battle(battle) => render_battle(&battle.snapshot()),
            },
            other => bail!("unknown command '{other}', try 'help'"),
        }
        Ok(())
    }

    async fn start_drill(&mut self, args: &[&str]) -> anyhow::Result<()> {
        let opening = match args.first() {
            Some(id) => self.catalog.get(id)?,
            None => self.catalog.first(),
        };
        let mut session = DrillSession::new(opening, self.config.timing);
        for arg in args.iter().skip(1) {
            match *arg {
                "learn" => session.set_mode(Mode::Learn),
                "practice" => session.set_mode(Mode::Practice),
                other => session.set_color(other.parse::<Color>()?),
            }
        }
        // Drop the old runner first so its timers are cancelled.
        self.screen = Screen::Idle;
        let runner = DrillRunner::new(session);
        settle(&runner).await;
        render_drill(&runner.view());
        self.screen = Screen::Drill(runner);
        Ok(())
    }

    async fn start_battle(&mut self, args: &[&str]) -> anyhow::Result<()> {
        let color = match args.first() {
            Some(c) => c.parse::<Color>()?,
            None => Color::White,
        };
        let battle = BattleOrchestrator::new(Arc::clone(&self.client), color, self.config.timing);
        self.screen = Screen::Battle(battle.clone());
        if color == Color::Black {
            println!("Opponent is thinking...");
        }
        if let Some(outcome) = battle.start().await {
            report_opponent(&outcome);
        }
        render_battle(&battle.snapshot());
        Ok(())
    }

    async fn play(&self, from: Square, to: Square) -> anyhow::Result<()> {
        match &self.screen {
            Screen::Idle => bail!("start a drill or a battle first"),
            Screen::Drill(runner) => {
                match runner.submit_move(from, to) {
                    MoveOutcome::Ignored(IgnoreReason::Complete) => println!("The line is complete."),
                    MoveOutcome::Ignored(IgnoreReason::NotLearnerTurn) => println!("Wait for the opponent."),
                    MoveOutcome::Accepted { .. } | MoveOutcome::Rejected => {}
                }
                render_drill(&runner.view());
                if runner.view().disabled && !runner.view().complete {
                    settle(runner).await;
                    render_drill(&runner.view());
                }
            }
            Screen::Battle(battle) => {
                let (player, opponent) = battle.submit_move(from, to).await;
                match player {
                    PlayerMoveOutcome::Played { notation, .. } => println!("You played {notation}"),
                    PlayerMoveOutcome::Ignored(reason) => println!("{}", ignore_text(reason)),
                }
                if let Some(outcome) = opponent {
                    report_opponent(&outcome);
                }
                render_battle(&battle.snapshot());
            }
        }
        Ok(())
    }

    fn drill(&self) -> anyhow::Result<&DrillRunner> {
        match &self.screen {
            Screen::Drill(runner) => Ok(runner),
            _ => Err(anyhow!("no drill in progress")),
        }
    }

    fn battle(&self) -> anyhow::Result<&BattleOrchestrator<ChatClient>> {
        match &self.screen {
            Screen::Battle(battle) => Ok(battle),
            _ => Err(anyhow!("no battle in progress")),
        }
    }
}

fn parse_move(args: &[&str]) -> anyhow::Result<(Square, Square)> {
    match args {
        [from, to] => Ok((from.parse()?, to.parse()?)),
        // "move e2e4"
        [both] => match (both.get(..2), both.get(2..)) {
            (Some(from), Some(to)) if !to.is_empty() => Ok((from.parse()?, to.parse()?)),
            _ => bail!("usage: move <from> <to>"),
        },
        _ => bail!("usage: move <from> <to>"),
    }
}

/// Wait for scheduled opponent plies to land.
async fn settle(runner: &DrillRunner) {
    for _ in 0..40 {
        let view = runner.view();
        if view.complete || !view.disabled {
            return;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}

fn ignore_text(reason: BattleIgnore) -> &'static str {
    match reason {
        BattleIgnore::NotPlaying => "The game is not running.",
        BattleIgnore::Thinking => "The opponent is still thinking.",
        BattleIgnore::NotPlayerTurn => "It is not your turn.",
        BattleIgnore::EmptySquare => "There is no piece on that square.",
    }
}

fn report_opponent(outcome: &OpponentOutcome) {
    match outcome {
        OpponentOutcome::Applied { notation, .. } => println!("Opponent played {notation}"),
        OpponentOutcome::Unresolved => println!("The opponent's move could not be read. Use 'retry' or 'resign'."),
        OpponentOutcome::Failed => println!("The opponent did not answer. Use 'retry' or 'resign'."),
        OpponentOutcome::Stale => {}
    }
}

fn describe_last(last: Option<Move>) -> String {
    last.map(|m| format!("Last move: {m}")).unwrap_or_default()
}

fn render_drill(view: &DrillView) {
    println!();
    println!("{}", view.board.to_diagram());
    println!(
        "{} | {:?} as {} | ply {}/{} | correct {} wrong {}",
        view.opening_id,
        view.mode,
        view.color,
        view.ply,
        view.line_len,
        view.stats.correct,
        view.stats.wrong
    );
    let last = describe_last(view.last_move);
    if !last.is_empty() {
        println!("{last}");
    }
    if !view.highlighted.is_empty() {
        let squares: Vec<String> = view.highlighted.iter().map(Square::to_string).collect();
        println!("Hint: {}", squares.join(" -> "));
    }
    if let Some(feedback) = &view.feedback {
        let marker = match feedback.kind {
            FeedbackKind::Success => "+",
            FeedbackKind::Error => "x",
            FeedbackKind::Info => "*",
        };
        println!("{marker} {}", feedback.message);
    }
    if view.complete {
        println!("{}", trainer::drill::COMPLETION_MESSAGE);
    }
}

fn render_battle(view: &BattleView) {
    println!();
    println!("{}", view.board.to_diagram());
    println!("You play {} | {}", view.color, view.movetext);
    let last = describe_last(view.last_move);
    if !last.is_empty() {
        println!("{last}");
    }
    if let Some(c) = &view.commentary {
        if !c.thinking.is_empty() {
            println!("Opponent: {} ({}, confidence {}%)", c.thinking, c.evaluation, c.confidence);
        }
        if let Some(reaction) = &c.reaction {
            println!("Reaction: {reaction}");
        }
    }
    match view.phase {
        Phase::Ended => {
            if let Some(result) = &view.result {
                println!("{result}");
            }
        }
        Phase::Setup => println!("Game not started."),
        Phase::Playing if view.stalled => println!("Waiting for 'retry' or 'resign'."),
        Phase::Playing => {}
    }
}
