//! Terminal UI showing one level gauge per channel, refreshed at the tick
//! rate. Press `q` to quit.

use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::{Constraint, Layout},
    style::{Color, Style},
    symbols,
    widgets::{Block, Borders, LineGauge},
    Frame, Terminal,
};
use std::{
    error::Error,
    io,
    time::{Duration, Instant},
};

type LevelGenerator = Box<dyn FnMut() -> Vec<(String, f64)>>;
type TimeGenerator = Box<dyn FnMut() -> f64>;

struct App {
    level_generator: LevelGenerator,
    time_generator: TimeGenerator,
    levels: Vec<(String, f64)>,
    time: f64,
}

impl App {
    fn new(level_generator: LevelGenerator, time_generator: TimeGenerator) -> App {
        App {
            level_generator,
            time_generator,
            levels: vec![],
            time: 0.0,
        }
    }

    fn on_tick(&mut self) {
        self.levels = (self.level_generator)();
        self.time = (self.time_generator)();
    }
}

pub fn engage_gui(
    level_generator: LevelGenerator,
    time_generator: TimeGenerator,
    tick_rate: Duration,
) -> Result<(), Box<dyn Error>> {
    // setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // create app and run it
    let app = App::new(level_generator, time_generator);
    let res = run_app(&mut terminal, app, tick_rate);

    // restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("{:?}", err)
    }

    Ok(())
}

fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    mut app: App,
    tick_rate: Duration,
) -> io::Result<()> {
    let mut last_tick = Instant::now();
    loop {
        terminal.draw(|f| ui(f, &mut app))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_secs(0));
        if crossterm::event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if let KeyCode::Char('q') = key.code {
                    return Ok(());
                }
            }
        }
        if last_tick.elapsed() >= tick_rate {
            app.on_tick();
            last_tick = Instant::now();
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" emg levels @ {:.2} s (q quits) ", app.time));
    let inner = block.inner(f.size());
    f.render_widget(block, f.size());

    let rows = Layout::vertical(
        app.levels
            .iter()
            .map(|_| Constraint::Length(1))
            .collect::<Vec<_>>(),
    )
    .split(inner);

    for (row, (name, level)) in rows.iter().zip(app.levels.iter()) {
        let gauge = LineGauge::default()
            .label(format!("{:>8}", name))
            .ratio(level.clamp(0.0, 1.0))
            .line_set(symbols::line::THICK)
            .gauge_style(Style::default().fg(Color::Cyan).bg(Color::DarkGray));
        f.render_widget(gauge, *row);
    }
}
