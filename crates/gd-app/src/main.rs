//! Main application entry point

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use gd_core::events::events::{QueryFailed, RecordsLoaded, SelectionChanged};
use gd_core::{DashboardSettings, Orchestrator, RecordSource};
use gd_data::{MemoryRecordStore, SampleGenerator, SimulatedSource};
use gd_views::{ListView, SpaceView, SpaceViewId, SpatialView, ViewerContext};

mod commands;
mod render;

use commands::Command;

/// Geo dashboard: a paged, sortable record list with a linked map
#[derive(Parser, Debug)]
#[command(name = "geodash")]
#[command(version)]
struct Args {
    /// JSON settings file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Load records from a CSV file instead of generating them
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Number of generated records
    #[arg(long)]
    records: Option<usize>,
}

/// Something the views should be redrawn for
#[derive(Debug)]
enum Notice {
    PageApplied,
    QueryFailed(String),
    SelectionChanged,
}

/// Main application state
struct DashboardApp {
    orchestrator: Orchestrator,
    source: Arc<SimulatedSource<MemoryRecordStore>>,
    context: ViewerContext,
    list: ListView,
    map: SpatialView,
}

impl DashboardApp {
    fn new(settings: &DashboardSettings, store: MemoryRecordStore) -> Result<Self> {
        let latency = Duration::from_millis(settings.source.simulated_latency_ms);
        let source = Arc::new(SimulatedSource::new(store, latency));
        info!(
            source = source.source_name(),
            latency = %humantime::format_duration(latency),
            debounce = %humantime::format_duration(settings.debounce()),
            "starting dashboard"
        );

        let orchestrator = Orchestrator::new(source.clone(), settings)?;
        let context = ViewerContext::from_orchestrator(&orchestrator);

        Ok(Self {
            orchestrator,
            source,
            context,
            list: ListView::new(SpaceViewId::new_v4(), "Records".to_string()),
            map: SpatialView::new(SpaceViewId::new_v4(), "Map".to_string()),
        })
    }

    /// Forward bus events that change what the views show
    fn subscribe(&self, tx: mpsc::UnboundedSender<Notice>) {
        let bus = self.orchestrator.event_bus();

        let loaded = tx.clone();
        bus.subscribe_fn::<RecordsLoaded, _>(move |event| {
            debug!(generation = event.generation, records = event.record_count, "page applied");
            let _ = loaded.send(Notice::PageApplied);
        });

        let failed = tx.clone();
        bus.subscribe_fn::<QueryFailed, _>(move |event| {
            let _ = failed.send(Notice::QueryFailed(event.message.clone()));
        });

        bus.subscribe_fn::<SelectionChanged, _>(move |_| {
            let _ = tx.send(Notice::SelectionChanged);
        });
    }

    /// Apply one command; returns false to quit
    fn handle(&mut self, command: Command) -> bool {
        match command {
            Command::Page(page) => self.list.change_page(page),
            Command::Next => {
                self.orchestrator.next_page();
            }
            Command::Prev => {
                self.orchestrator.previous_page();
            }
            Command::Size(size) => self.list.change_page_size(size),
            Command::Sort(field) => self.list.click_sort(field),
            Command::Filter(text) => self.list.change_filter_text(text),
            Command::Status(status) => self.list.change_status_filter(status),
            Command::Select(id) => self.list.click_row(id),
            Command::Clear => self.list.clear_selection(),
            Command::Refresh => self.list.refresh(),
            Command::Fail(message) => {
                self.source.fail_next(message);
                self.list.refresh();
            }
            Command::Show => self.show(),
            Command::Help => println!("{}", commands::HELP),
            Command::Quit => return false,
        }

        self.dispatch_view_events();
        true
    }

    fn dispatch_view_events(&mut self) {
        let mut events = self.list.drain_events();
        events.extend(self.map.drain_events());
        for event in events {
            self.orchestrator.dispatch(event);
        }
    }

    fn show(&mut self) {
        let list = self.list.frame(&self.context);
        let map = self.map.frame(&self.context);
        println!("{}", render::list(&list));
        println!("{}", render::map(&map));
    }

    fn notice(&mut self, notice: Notice) {
        match notice {
            Notice::PageApplied | Notice::SelectionChanged => self.show(),
            Notice::QueryFailed(message) => {
                warn!(%message, "query failed");
                self.show();
            }
        }
    }
}

fn load_store(args: &Args, settings: &DashboardSettings) -> Result<MemoryRecordStore> {
    if let Some(path) = &args.csv {
        return MemoryRecordStore::from_csv_path(path)
            .with_context(|| format!("failed to load records from {}", path.display()));
    }

    let count = args.records.unwrap_or(settings.source.sample_records);
    let records = SampleGenerator::new(settings.source.seed).generate(count)?;
    Ok(MemoryRecordStore::new("sample", records)?)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Stdout carries the views
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let args = Args::parse();
    let settings = match &args.config {
        Some(path) => DashboardSettings::load(path)?,
        None => DashboardSettings::default(),
    };

    let store = load_store(&args, &settings)?;
    let mut app = DashboardApp::new(&settings, store)?;

    let (tx, mut notices) = mpsc::unbounded_channel();
    app.subscribe(tx);
    app.orchestrator.mount();
    app.show();
    println!("type 'help' for commands");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("failed to read stdin")? else {
                    break;
                };
                match commands::parse(&line) {
                    Ok(Some(command)) => {
                        if !app.handle(command) {
                            break;
                        }
                    }
                    Ok(None) => {}
                    Err(e) => println!("{:#}", e),
                }
            }
            Some(notice) = notices.recv() => app.notice(notice),
        }
    }

    app.orchestrator.shutdown();
    info!("dashboard closed");
    Ok(())
}
