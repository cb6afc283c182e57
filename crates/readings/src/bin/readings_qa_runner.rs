use std::env;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use arc_swap::ArcSwap;
use serde_json::{Value, json};
use snafu::{OptionExt, Snafu, ensure};
use tokio::sync::mpsc;

use parley_conference::{
    ConferenceErrorKind, ConferenceEvent, ConferenceId, ConferenceSession, ListenerId,
    Participant, ParticipantId,
};
use parley_readings::{
    HostApiNotifier, NotificationSink, Notifier, ReadingsService, ReadingsSettings, RecordKind,
};

#[derive(Debug, Clone)]
struct RunnerArgs {
    scenario: Scenario,
}

#[derive(Debug, Clone, Copy)]
enum Scenario {
    PanelToggle,
    UnreadFlow,
    RemoteSound,
    LocalEcho,
    ErrorRecord,
    ConferenceChange,
    SendTrimming,
    RecorderSuppression,
    EnvelopeFiltering,
    All,
}

impl Scenario {
    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "panel_toggle" => Some(Self::PanelToggle),
            "unread_flow" => Some(Self::UnreadFlow),
            "remote_sound" => Some(Self::RemoteSound),
            "local_echo" => Some(Self::LocalEcho),
            "error_record" => Some(Self::ErrorRecord),
            "conference_change" => Some(Self::ConferenceChange),
            "send_trimming" => Some(Self::SendTrimming),
            "recorder_suppression" => Some(Self::RecorderSuppression),
            "envelope_filtering" => Some(Self::EnvelopeFiltering),
            "all" => Some(Self::All),
            _ => None,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::PanelToggle => "panel_toggle",
            Self::UnreadFlow => "unread_flow",
            Self::RemoteSound => "remote_sound",
            Self::LocalEcho => "local_echo",
            Self::ErrorRecord => "error_record",
            Self::ConferenceChange => "conference_change",
            Self::SendTrimming => "send_trimming",
            Self::RecorderSuppression => "recorder_suppression",
            Self::EnvelopeFiltering => "envelope_filtering",
            Self::All => "all",
        }
    }
}

#[derive(Debug, Snafu)]
enum RunnerError {
    #[snafu(display("missing required --scenario argument"))]
    MissingScenario { stage: &'static str },
    #[snafu(display("missing value for argument '{arg}'"))]
    MissingArgumentValue {
        stage: &'static str,
        arg: &'static str,
    },
    #[snafu(display("unknown scenario '{raw}'"))]
    UnknownScenario { stage: &'static str, raw: String },
    #[snafu(display("unknown argument '{raw}'"))]
    UnknownArgument { stage: &'static str, raw: String },
    #[snafu(display("scenario '{scenario}' failed: {reason}"))]
    ScenarioFailed {
        stage: &'static str,
        scenario: &'static str,
        reason: String,
    },
}

type RunnerResult<T> = Result<T, RunnerError>;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt::init();

    if let Err(error) = run().await {
        println!("runner_ok=false");
        eprintln!("runner_error={error}");
        std::process::exit(1);
    }
}

async fn run() -> RunnerResult<()> {
    let args = parse_args(env::args().skip(1))?;
    println!("scenario={}", args.scenario.name());

    match args.scenario {
        Scenario::PanelToggle => run_panel_toggle(),
        Scenario::UnreadFlow => run_unread_flow(),
        Scenario::RemoteSound => run_remote_sound().await,
        Scenario::LocalEcho => run_local_echo(),
        Scenario::ErrorRecord => run_error_record(),
        Scenario::ConferenceChange => run_conference_change(),
        Scenario::SendTrimming => run_send_trimming(),
        Scenario::RecorderSuppression => run_recorder_suppression(),
        Scenario::EnvelopeFiltering => run_envelope_filtering(),
        Scenario::All => run_all().await,
    }
}

async fn run_all() -> RunnerResult<()> {
    run_panel_toggle()?;
    run_unread_flow()?;
    run_remote_sound().await?;
    run_local_echo()?;
    run_error_record()?;
    run_conference_change()?;
    run_send_trimming()?;
    run_recorder_suppression()?;
    run_envelope_filtering()?;
    Ok(())
}

fn parse_args(args: impl IntoIterator<Item = String>) -> RunnerResult<RunnerArgs> {
    let mut scenario = None;
    let mut pending = args.into_iter();

    // The parser is intentionally strict so scenario runs stay
    // deterministic in CI.
    while let Some(argument) = pending.next() {
        match argument.as_str() {
            "--scenario" => {
                let value = pending.next().context(MissingArgumentValueSnafu {
                    stage: "parse-args-scenario-value",
                    arg: "--scenario",
                })?;

                let parsed = Scenario::parse(&value).context(UnknownScenarioSnafu {
                    stage: "parse-args-scenario",
                    raw: value,
                })?;
                scenario = Some(parsed);
            }
            _ => {
                return UnknownArgumentSnafu {
                    stage: "parse-args",
                    raw: argument,
                }
                .fail();
            }
        }
    }

    Ok(RunnerArgs {
        scenario: scenario.context(MissingScenarioSnafu {
            stage: "parse-args-scenario-required",
        })?,
    })
}

/// In-process conference used to drive the service end to end.
struct ScriptedConference {
    id: ConferenceId,
    log: Arc<Mutex<Vec<String>>>,
    feed: Mutex<Option<mpsc::UnboundedSender<ConferenceEvent>>>,
    sent_payloads: Mutex<Vec<Value>>,
}

impl ScriptedConference {
    fn new(id: u64, log: Arc<Mutex<Vec<String>>>) -> Arc<Self> {
        Arc::new(Self {
            id: ConferenceId::new(id),
            log,
            feed: Mutex::new(None),
            sent_payloads: Mutex::new(Vec::new()),
        })
    }

    fn deliver(&self, event: ConferenceEvent) {
        if let Some(feed) = self.feed.lock().unwrap().as_ref() {
            let _ = feed.send(event);
        }
    }

    fn close_feed(&self) {
        self.feed.lock().unwrap().take();
    }
}

impl ConferenceSession for ScriptedConference {
    fn conference_id(&self) -> ConferenceId {
        self.id
    }

    fn send_text_message(&self, body: &str) {
        self.log.lock().unwrap().push(format!("send_text:{body}"));
    }

    fn send_application_message(&self, payload: &Value) {
        self.log.lock().unwrap().push("send_app".to_string());
        self.sent_payloads.lock().unwrap().push(payload.clone());
    }

    fn register_listener(&self, feed: mpsc::UnboundedSender<ConferenceEvent>) -> ListenerId {
        self.log
            .lock()
            .unwrap()
            .push(format!("register:{}", self.id.0));
        *self.feed.lock().unwrap() = Some(feed);
        ListenerId::new(self.id.0)
    }

    fn unregister_listener(&self, _listener: ListenerId) {
        self.log
            .lock()
            .unwrap()
            .push(format!("unregister:{}", self.id.0));
        self.feed.lock().unwrap().take();
    }

    fn lookup_participant(&self, id: &ParticipantId) -> Option<Participant> {
        match id.as_str() {
            "me" => Some(Participant::new("me", Some("Me".to_string()), true)),
            "alice" => Some(Participant::new("alice", Some("Alice".to_string()), false)),
            _ => None,
        }
    }

    fn local_participant(&self) -> Option<Participant> {
        Some(Participant::new("me", Some("Me".to_string()), true))
    }
}

struct CountingSink {
    log: Arc<Mutex<Vec<String>>>,
}

impl NotificationSink for CountingSink {
    fn play_incoming_message_sound(&self) {
        self.log.lock().unwrap().push("sound".to_string());
    }

    fn reveal_toolbox(&self, _timeout: Option<Duration>) {
        self.log.lock().unwrap().push("toolbox".to_string());
    }
}

struct CountingHostApi {
    log: Arc<Mutex<Vec<String>>>,
}

impl HostApiNotifier for CountingHostApi {
    fn unread_count_changed(&self, count: usize, panel_open: bool) {
        self.log
            .lock()
            .unwrap()
            .push(format!("unread:{count}:{panel_open}"));
    }
}

struct Rig {
    service: ReadingsService,
    settings: Arc<ArcSwap<ReadingsSettings>>,
    log: Arc<Mutex<Vec<String>>>,
}

fn build_rig() -> Rig {
    let log = Arc::new(Mutex::new(Vec::new()));
    let settings = Arc::new(ArcSwap::from_pointee(ReadingsSettings::default()));
    let notifier = Notifier::new()
        .with_sink(Arc::new(CountingSink { log: log.clone() }))
        .with_host_api(Arc::new(CountingHostApi { log: log.clone() }));
    let service = ReadingsService::new(settings.clone(), notifier);
    Rig {
        service,
        settings,
        log,
    }
}

fn log_count(log: &Arc<Mutex<Vec<String>>>, entry: &str) -> usize {
    log.lock()
        .unwrap()
        .iter()
        .filter(|logged| logged.as_str() == entry)
        .count()
}

fn remote_message(body: &str, timestamp_ms: u64) -> ConferenceEvent {
    ConferenceEvent::MessageReceived {
        sender: ParticipantId::from("alice"),
        body: body.to_string(),
        timestamp_ms: Some(timestamp_ms),
    }
}

fn run_panel_toggle() -> RunnerResult<()> {
    let mut rig = build_rig();

    rig.service.toggle_panel();
    ensure!(
        rig.service.snapshot().is_open,
        ScenarioFailedSnafu {
            stage: "scenario-panel-toggle",
            scenario: "panel_toggle",
            reason: "toggle did not open the panel".to_string(),
        }
    );

    rig.service.toggle_panel();
    ensure!(
        !rig.service.snapshot().is_open,
        ScenarioFailedSnafu {
            stage: "scenario-panel-toggle",
            scenario: "panel_toggle",
            reason: "toggle did not close the panel".to_string(),
        }
    );

    println!("panel_toggle=true");
    println!("runner_ok=true");
    Ok(())
}

fn run_unread_flow() -> RunnerResult<()> {
    let mut rig = build_rig();
    let conference = ScriptedConference::new(1, rig.log.clone());
    rig.service.attach_conference(conference);

    rig.service.close_panel();
    rig.service.handle_event(remote_message("hi", 1));
    let after_append = rig.service.snapshot().unread_count;

    rig.service.close_panel();
    let after_close = rig.service.snapshot().unread_count;

    ensure!(
        after_append == 1 && after_close == 0,
        ScenarioFailedSnafu {
            stage: "scenario-unread-flow",
            scenario: "unread_flow",
            reason: format!("expected 1 then 0 unread, got {after_append} then {after_close}"),
        }
    );

    println!("unread_after_append={after_append}");
    println!("unread_after_close={after_close}");
    println!("runner_ok=true");
    Ok(())
}

async fn run_remote_sound() -> RunnerResult<()> {
    let mut rig = build_rig();
    let conference = ScriptedConference::new(1, rig.log.clone());
    let feed = rig
        .service
        .attach_conference(conference.clone())
        .context(ScenarioFailedSnafu {
            stage: "scenario-remote-sound",
            scenario: "remote_sound",
            reason: "no event feed returned on attach".to_string(),
        })?;

    conference.deliver(remote_message("hi", 1));
    conference.close_feed();
    rig.service.pump(feed).await;

    let sounds = log_count(&rig.log, "sound");
    ensure!(
        sounds == 1,
        ScenarioFailedSnafu {
            stage: "scenario-remote-sound",
            scenario: "remote_sound",
            reason: format!("expected exactly one sound, got {sounds}"),
        }
    );

    println!("sound_count={sounds}");
    println!("runner_ok=true");
    Ok(())
}

fn run_local_echo() -> RunnerResult<()> {
    let mut rig = build_rig();
    let conference = ScriptedConference::new(1, rig.log.clone());
    rig.service.attach_conference(conference);

    rig.service.compose_and_send(" hello ");
    rig.service.handle_event(ConferenceEvent::MessageReceived {
        sender: ParticipantId::from("me"),
        body: "hello".to_string(),
        timestamp_ms: Some(1),
    });

    let snapshot = rig.service.snapshot();
    let sounds = log_count(&rig.log, "sound");
    let local_and_silent = snapshot.records.len() == 1
        && snapshot.records[0].kind == RecordKind::Local
        && snapshot.records[0].read
        && snapshot.unread_count == 0
        && sounds == 0;

    ensure!(
        local_and_silent,
        ScenarioFailedSnafu {
            stage: "scenario-local-echo",
            scenario: "local_echo",
            reason: "echoed local message was not appended read and silent".to_string(),
        }
    );

    println!("local_echo_silent=true");
    println!("runner_ok=true");
    Ok(())
}

fn run_error_record() -> RunnerResult<()> {
    let mut rig = build_rig();
    let conference = ScriptedConference::new(1, rig.log.clone());
    rig.service.attach_conference(conference);

    rig.service.handle_event(remote_message("hi", 1));
    let unread_before = rig.service.snapshot().unread_count;

    rig.service.handle_event(ConferenceEvent::ConferenceError {
        kind: ConferenceErrorKind::Messaging,
        detail: "timeout".to_string(),
    });

    let snapshot = rig.service.snapshot();
    let appended = snapshot.records.len() == 2
        && snapshot.records[1].kind == RecordKind::Error
        && snapshot.records[1].read
        && snapshot.unread_count == unread_before;

    ensure!(
        appended,
        ScenarioFailedSnafu {
            stage: "scenario-error-record",
            scenario: "error_record",
            reason: "messaging error did not append an acknowledged record".to_string(),
        }
    );

    println!("error_record_acknowledged=true");
    println!("runner_ok=true");
    Ok(())
}

fn run_conference_change() -> RunnerResult<()> {
    let mut rig = build_rig();
    let first = ScriptedConference::new(1, rig.log.clone());
    rig.service.attach_conference(first);

    rig.service.open_panel();
    rig.service.handle_event(remote_message("one", 1));

    let second = ScriptedConference::new(2, rig.log.clone());
    rig.service.attach_conference(second);

    let entries = rig.log.lock().unwrap().clone();
    let unregister = entries.iter().position(|entry| entry == "unregister:1");
    let close_notify = entries.iter().position(|entry| entry == "unread:0:false");
    let reregister = entries.iter().position(|entry| entry == "register:2");

    let ordered = matches!(
        (unregister, close_notify, reregister),
        (Some(a), Some(b), Some(c)) if a < b && b < c
    );
    let snapshot = rig.service.snapshot();

    ensure!(
        ordered && snapshot.records.is_empty() && !snapshot.is_open,
        ScenarioFailedSnafu {
            stage: "scenario-conference-change",
            scenario: "conference_change",
            reason: format!("teardown out of order or incomplete: {entries:?}"),
        }
    );

    println!("teardown_ordered=true");
    println!("runner_ok=true");
    Ok(())
}

fn run_send_trimming() -> RunnerResult<()> {
    let mut rig = build_rig();
    let conference = ScriptedConference::new(1, rig.log.clone());
    rig.service.attach_conference(conference);

    rig.service.compose_and_send("");
    rig.service.compose_and_send("   ");
    rig.service.compose_and_send(" hi ");

    let entries = rig.log.lock().unwrap().clone();
    let sends = entries
        .iter()
        .filter(|entry| entry.starts_with("send_text:"))
        .cloned()
        .collect::<Vec<_>>();

    ensure!(
        sends == ["send_text:hi"],
        ScenarioFailedSnafu {
            stage: "scenario-send-trimming",
            scenario: "send_trimming",
            reason: format!("expected a single trimmed send, got {sends:?}"),
        }
    );

    println!("send_trimming=true");
    println!("runner_ok=true");
    Ok(())
}

fn run_recorder_suppression() -> RunnerResult<()> {
    let mut rig = build_rig();
    rig.settings.store(Arc::new(ReadingsSettings {
        i_am_recorder: true,
        ..ReadingsSettings::default()
    }));

    let conference = ScriptedConference::new(1, rig.log.clone());
    let feed = rig.service.attach_conference(conference);
    let registered = log_count(&rig.log, "register:1");

    ensure!(
        feed.is_none() && registered == 0,
        ScenarioFailedSnafu {
            stage: "scenario-recorder-suppression",
            scenario: "recorder_suppression",
            reason: "recorder endpoint registered a listener".to_string(),
        }
    );

    println!("recorder_registrations={registered}");
    println!("runner_ok=true");
    Ok(())
}

fn run_envelope_filtering() -> RunnerResult<()> {
    let mut rig = build_rig();
    let conference = ScriptedConference::new(1, rig.log.clone());
    rig.service.attach_conference(conference.clone());

    rig.service
        .handle_event(ConferenceEvent::ApplicationMessageReceived {
            sender: ParticipantId::from("alice"),
            payload: json!({ "type": "POLL_VOTE", "choice": 2 }),
        });
    let foreign_ignored = rig.service.snapshot().records.is_empty();

    rig.service.compose_and_send_reading("evening passage");
    let payload = conference
        .sent_payloads
        .lock()
        .unwrap()
        .last()
        .cloned()
        .context(ScenarioFailedSnafu {
            stage: "scenario-envelope-filtering",
            scenario: "envelope_filtering",
            reason: "no reading envelope reached the transport".to_string(),
        })?;

    rig.service
        .handle_event(ConferenceEvent::ApplicationMessageReceived {
            sender: ParticipantId::from("alice"),
            payload,
        });
    let reading_appended = rig.service.snapshot().records.len() == 1;

    ensure!(
        foreign_ignored && reading_appended,
        ScenarioFailedSnafu {
            stage: "scenario-envelope-filtering",
            scenario: "envelope_filtering",
            reason: "envelope filtering did not behave as expected".to_string(),
        }
    );

    println!("foreign_ignored={foreign_ignored}");
    println!("reading_appended={reading_appended}");
    println!("runner_ok=true");
    Ok(())
}
