use std::collections::HashSet;

use chrono::Utc;
use clap::{Parser, Subcommand};
use conference_guide::{
  config::Config,
  presenters::{
    active_presenter_ids, fetch_presenters_list, filter_presenters,
    sessions_for_presenter, sort_presenters,
  },
  schedule::{
    LoadOutcome, ScheduleLoader, assemble_schedule,
    model::{Event, SponsorKind},
  },
  sections::{
    ALL_TRACKS_LABEL, EventFilter, ScheduleView, distinct_tracks,
    filter_events, my_schedule_count, section_by_day, select_view,
  },
  sponsors::{fetch_event_sponsors_by_ids, fetch_sponsor, fetch_sponsor_groups},
  text::{excerpt, renderable_text},
  wp::WpClient,
};
use miette::{Context, IntoDiagnostic};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const DESCRIPTION_EXCERPT_LEN: usize = 100;
const BIO_EXCERPT_LEN: usize = 120;

#[derive(Parser)]
#[command(
  version,
  about = "Browse the conference schedule, presenters and sponsors"
)]
struct Cli {
  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Print the schedule, grouped by day.
  Schedule {
    #[arg(long, default_value_t = ScheduleView::All)]
    view:      ScheduleView,
    #[arg(long, default_value = "")]
    search:    String,
    /// Only honored by the `sessions` and `mine` views.
    #[arg(long)]
    track:     Option<String>,
    #[arg(long)]
    show_past: bool,
    /// Favorited event id; repeat for more.
    #[arg(long = "favorite")]
    favorites: Vec<String>,
    /// Print the filtered events as JSON instead of day sections.
    #[arg(long)]
    json:      bool,
  },
  /// Print presenters who appear on the schedule.
  Presenters {
    #[arg(long, default_value = "")]
    search: String,
  },
  /// Print the sponsor groups.
  Sponsors,
  /// Print one sponsor.
  Sponsor { kind: SponsorKind, id: u32 },
  /// Resolve sponsor ids whose content type is unknown.
  EventSponsors {
    #[arg(required = true)]
    ids: Vec<u32>,
  },
}

#[tokio::main]
async fn main() -> miette::Result<()> {
  tracing_subscriber::registry()
    .with(fmt::layer())
    .with(EnvFilter::from_default_env())
    .init();

  let cli = Cli::parse();
  let config =
    Config::from_env().context("failed to gather config from env")?;
  let client = WpClient::new(&config.wp_base_url);
  let schedule_config = config.schedule;

  match cli.command {
    Command::Schedule {
      view,
      search,
      track,
      show_past,
      favorites,
      json,
    } => {
      let loader = ScheduleLoader::new(client, schedule_config);
      let snapshot = match loader
        .load()
        .await
        .context("failed to load schedule")?
      {
        LoadOutcome::Applied(snapshot) => snapshot,
        LoadOutcome::Superseded { generation } => {
          miette::bail!("schedule load {generation} was superseded")
        }
      };

      let favorites = favorites.into_iter().collect::<HashSet<_>>();
      let track = match track {
        Some(_) if !view.supports_track_filter() => {
          warn!(%view, "ignoring track filter for this view");
          None
        }
        Some(track) => {
          if !distinct_tracks(&snapshot.sessions).contains(&track) {
            warn!(track, "no sessions are on this track");
          }
          Some(track)
        }
        None => None,
      };
      let filter = EventFilter {
        search,
        track,
        show_past,
        ..EventFilter::upcoming(Utc::now(), loader.config().timezone)
      };

      let events =
        filter_events(select_view(&snapshot, view, &favorites), &filter);
      if view == ScheduleView::Mine {
        info!(
          favorited = my_schedule_count(&snapshot.all_events, &favorites),
          "loaded my schedule"
        );
      }

      if json {
        let out = serde_json::to_string_pretty(&events)
          .into_diagnostic()
          .context("failed to serialize events")?;
        println!("{out}");
        return Ok(());
      }
      let social_kind = &loader.config().social_kind;
      for section in section_by_day(events) {
        println!("== {} ==", section.title);
        for event in section.data {
          print_event(event, social_kind);
        }
        println!();
      }
    }
    Command::Presenters { search } => {
      let (presenters, snapshot) = tokio::join!(
        fetch_presenters_list(&client, &schedule_config),
        assemble_schedule(&client, &schedule_config),
      );
      let mut presenters =
        presenters.context("failed to fetch presenter directory")?;
      let snapshot = snapshot.context("failed to load schedule")?;

      sort_presenters(&mut presenters);
      let active = active_presenter_ids(&snapshot.all_events);
      for presenter in filter_presenters(&presenters, &active, &search) {
        let role = [presenter.title.as_str(), presenter.org.as_str()]
          .into_iter()
          .filter(|s| !s.is_empty())
          .collect::<Vec<_>>()
          .join(", ");
        println!("{} ({role})", presenter.name);
        let bio = renderable_text(&presenter.bio_html);
        if !bio.is_empty() {
          println!("  {}", excerpt(&bio, BIO_EXCERPT_LEN));
        }
        for event in sessions_for_presenter(&snapshot.all_events, presenter.id)
        {
          println!("  - {} [{}]", event.title, event.time_range());
        }
      }
    }
    Command::Sponsors => {
      let groups = fetch_sponsor_groups(&client, &schedule_config)
        .await
        .context("failed to fetch sponsor groups")?;
      for group in groups {
        println!("== {} ==", group.label);
        for sponsor in group.sponsors {
          println!(
            "  {} {}",
            sponsor.name,
            sponsor.website.as_deref().unwrap_or_default()
          );
        }
      }
    }
    Command::Sponsor { kind, id } => {
      match fetch_sponsor(&client, &schedule_config, kind, id)
        .await
        .context("failed to fetch sponsor")?
      {
        Some(sponsor) => println!(
          "{} ({}) {}",
          sponsor.name,
          sponsor.key(),
          sponsor.logo_url.as_deref().unwrap_or_default()
        ),
        None => warn!(%kind, id, "not a configured sponsor kind"),
      }
    }
    Command::EventSponsors { ids } => {
      let cancel = CancellationToken::new();
      tokio::spawn({
        let cancel = cancel.clone();
        async move {
          if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
          }
        }
      });
      let sponsors =
        fetch_event_sponsors_by_ids(&client, &schedule_config, &ids, &cancel)
          .await
          .context("failed to resolve event sponsors")?;
      for sponsor in sponsors {
        println!("{} {}", sponsor.key(), sponsor.name);
      }
    }
  }

  Ok(())
}

fn print_event(event: &Event, social_kind: &str) {
  let track = event.display_track(social_kind);
  let track = if track.is_empty() || track == ALL_TRACKS_LABEL {
    String::new()
  } else {
    format!(" [{track}]")
  };
  let room = event
    .room
    .as_deref()
    .map(|r| format!(" @ {r}"))
    .unwrap_or_default();
  println!("{:>17}  {}{track}{room}", event.time_range(), event.title);

  let people = event
    .moderator
    .iter()
    .map(|m| format!("{} (moderator)", m.name))
    .chain(event.speakers.iter().map(|s| s.name.clone()))
    .collect::<Vec<_>>();
  if !people.is_empty() {
    println!("{:>17}  {}", "", people.join(", "));
  }
  let description = event.plain_description();
  if !description.is_empty() {
    println!(
      "{:>17}  {}",
      "",
      excerpt(&description.replace('\n', " "), DESCRIPTION_EXCERPT_LEN)
    );
  }
}
