//! services/api/src/bin/teech.rs
//!
//! A line-oriented terminal client for the study assistant. Plain lines are sent
//! to the tutor; lines starting with `/` are commands (see `/help`).

use api_lib::{client::HttpStudyClient, config::ClientConfig};
use std::path::Path;
use std::sync::Arc;
use study_assistant_core::{
    auth_context::{AuthContext, AuthOutcome},
    dashboard::{Dashboard, Tab},
    domain::{AuthSession, ChatMode, Message, Role},
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const HELP: &str = "\
Commands:
  /signup <email> <password> [full name]   create an account
  /login <email> <password>                sign in
  /google                                  print the Google sign-in URL
  /logout                                  sign out
  /courses                                 list courses
  /course <n>                              select or deselect course n
  /add-course <code> <name>                create a course
  /add-topic <name>                        add a topic to the selected course
  /topic <n>                               expand or collapse topic n
  /add-note <n> <title> | <content>        add a note to topic n
  /mode bounded|expanded                   switch tutor mode
  /attach <path>                           upload an image for the next message
  /clear-image                             drop the attached image
  /bookmark <message-id>                   save or unsave a message
  /saved                                   list saved messages
  /help                                    show this help
  /quit                                    exit
Anything else is sent to the tutor.";

struct Session {
    client: Arc<HttpStudyClient>,
    auth: AuthContext,
    dashboard: Option<Dashboard>,
}

impl Session {
    fn new(client: Arc<HttpStudyClient>) -> Self {
        Self {
            auth: AuthContext::new(client.clone()),
            client,
            dashboard: None,
        }
    }

    /// Opens the dashboard for the signed-in user, if any.
    async fn enter_dashboard(&mut self) {
        let (Some(user), Some(access_token)) =
            (self.auth.state().user, self.auth.access_token().await)
        else {
            self.dashboard = None;
            return;
        };
        println!(
            "Signed in as {}",
            user.full_name.as_deref().unwrap_or(&user.email)
        );
        println!(
            "(export TEECH_SESSION={} to resume this session)",
            access_token
        );

        let mut dashboard = Dashboard::new(
            AuthSession { access_token, user },
            self.client.clone(),
            self.client.clone(),
            self.client.clone(),
        );
        if let Err(e) = dashboard.refresh().await {
            println!("Could not load courses: {}", e);
        }
        print_messages(dashboard.messages());
        self.dashboard = Some(dashboard);
    }

    async fn report(&mut self, outcome: AuthOutcome) {
        match outcome {
            AuthOutcome::Success => self.enter_dashboard().await,
            AuthOutcome::Failed(reason) => println!("{}", reason),
        }
    }

    /// Handles one input line. Returns false when the user asked to quit.
    async fn handle(&mut self, line: &str) -> bool {
        let line = line.trim();
        if line.is_empty() {
            return true;
        }
        let Some(command) = line.strip_prefix('/') else {
            self.ask(line).await;
            return true;
        };

        let (name, rest) = command.split_once(' ').unwrap_or((command, ""));
        let rest = rest.trim();
        match name {
            "quit" | "exit" => return false,
            "help" => println!("{}", HELP),
            "signup" => {
                let mut parts = rest.splitn(3, ' ');
                match (parts.next(), parts.next()) {
                    (Some(email), Some(password)) => {
                        let full_name = parts.next().unwrap_or("");
                        let outcome = self.auth.sign_up(email, password, full_name).await;
                        self.report(outcome).await;
                    }
                    _ => println!("usage: /signup <email> <password> [full name]"),
                }
            }
            "login" => match rest.split_once(' ') {
                Some((email, password)) => {
                    let outcome = self.auth.sign_in(email, password.trim()).await;
                    self.report(outcome).await;
                }
                None => println!("usage: /login <email> <password>"),
            },
            "google" => println!("{}", self.auth.google_sign_in_url("http://localhost:3000/dashboard")),
            "logout" => {
                if let AuthOutcome::Failed(reason) = self.auth.sign_out().await {
                    println!("Signed out locally ({})", reason);
                } else {
                    println!("Signed out");
                }
                self.dashboard = None;
            }
            _ => match self.dashboard.as_mut() {
                Some(dashboard) => dashboard_command(dashboard, name, rest).await,
                None => println!("Sign in first (/login or /signup)."),
            },
        }
        true
    }

    async fn ask(&mut self, input: &str) {
        let Some(dashboard) = self.dashboard.as_mut() else {
            println!("Sign in first (/login or /signup).");
            return;
        };
        dashboard.select_tab(Tab::Solve);
        if let Some(reply_id) = dashboard.send_message(input).await {
            if let Some(reply) = dashboard.messages().iter().find(|m| m.id == reply_id) {
                print_messages(std::slice::from_ref(reply));
            }
        }
    }
}

async fn dashboard_command(dashboard: &mut Dashboard, name: &str, rest: &str) {
    match name {
        "courses" => {
            dashboard.select_tab(Tab::Courses);
            print_courses(dashboard);
        }
        "course" => match index_arg(rest, dashboard.courses().len()) {
            Some(i) => {
                let id = dashboard.courses()[i].id;
                dashboard.select_course(id);
                print_courses(dashboard);
            }
            None => println!("usage: /course <n>"),
        },
        "add-course" => match rest.split_once(' ') {
            Some((code, course_name)) => report_added(dashboard.add_course(course_name, code).await),
            None => println!("usage: /add-course <code> <name>"),
        },
        "add-topic" => {
            if dashboard.selected_course().is_none() {
                println!("Select a course first (/course <n>).");
                return;
            }
            report_added(dashboard.add_topic(rest).await);
        }
        "topic" => match selected_topic(dashboard, rest) {
            Some(id) => {
                dashboard.toggle_topic(id);
                print_courses(dashboard);
            }
            None => println!("usage: /topic <n> (with a course selected)"),
        },
        "add-note" => {
            let (index, note) = rest.split_once(' ').unwrap_or((rest, ""));
            let (title, content) = note.split_once('|').unwrap_or((note, ""));
            match selected_topic(dashboard, index) {
                Some(id) => report_added(dashboard.add_note(id, title, content.trim()).await),
                None => println!("usage: /add-note <n> <title> | <content>"),
            }
        }
        "mode" => match rest.parse::<ChatMode>() {
            Ok(mode) => {
                dashboard.set_mode(mode);
                println!("Mode: {}", mode);
            }
            Err(e) => println!("{}", e),
        },
        "attach" => match tokio::fs::read(rest).await {
            Ok(data) => {
                let file_name = Path::new(rest)
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or("image");
                if dashboard
                    .attach_image(file_name, content_type_for(rest), data)
                    .await
                {
                    println!("Attached {}", file_name);
                } else if let Some(last) = dashboard.messages().last() {
                    print_messages(std::slice::from_ref(last));
                }
            }
            Err(e) => println!("Could not read {}: {}", rest, e),
        },
        "clear-image" => dashboard.clear_image(),
        "bookmark" => match dashboard.toggle_bookmark(rest) {
            Some(true) => println!("Saved {}", rest),
            Some(false) => println!("Removed {} from saved", rest),
            None => println!("No message with id {}", rest),
        },
        "saved" => {
            dashboard.select_tab(Tab::Saved);
            let saved = dashboard.saved();
            if saved.is_empty() {
                println!("Nothing saved yet.");
            }
            for bookmark in saved {
                println!("[{}] {}", bookmark.message_id, bookmark.title);
            }
        }
        other => println!("Unknown command /{} (try /help)", other),
    }
}

fn report_added(result: study_assistant_core::PortResult<bool>) {
    match result {
        Ok(true) => println!("Added."),
        Ok(false) => println!("Nothing to add (empty field)."),
        Err(e) => println!("Failed: {}", e),
    }
}

/// Parses a 1-based index into a 0-based one below `len`.
fn index_arg(arg: &str, len: usize) -> Option<usize> {
    let n = arg.trim().parse::<usize>().ok()?;
    (1..=len).contains(&n).then(|| n - 1)
}

fn selected_topic(dashboard: &Dashboard, arg: &str) -> Option<uuid::Uuid> {
    let course = dashboard.selected_course()?;
    let i = index_arg(arg, course.topics.len())?;
    Some(course.topics[i].id)
}

fn content_type_for(path: &str) -> &'static str {
    let ext = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "image/jpeg",
    }
}

fn print_courses(dashboard: &Dashboard) {
    if dashboard.courses().is_empty() {
        println!("No courses yet. Add one with /add-course <code> <name>.");
        return;
    }
    let selected = dashboard.selected_course().map(|c| c.id);
    for (i, course) in dashboard.courses().iter().enumerate() {
        let marker = if Some(course.id) == selected { '*' } else { ' ' };
        println!("{} {}. [{}] {}", marker, i + 1, course.code, course.name);
        if Some(course.id) != selected {
            continue;
        }
        for (j, topic) in course.topics.iter().enumerate() {
            println!("     {}. {} ({} notes)", j + 1, topic.name, topic.notes.len());
            if dashboard.is_topic_expanded(topic.id) {
                for note in &topic.notes {
                    println!("        - {}", note.title);
                }
            }
        }
    }
}

fn print_messages(messages: &[Message]) {
    for message in messages {
        let who = match message.role {
            Role::User => "you",
            Role::Assistant => "teech",
        };
        println!("[{}] {}: {}", message.id, who, message.content);
        if let Some(url) = &message.image_url {
            println!("    image: {}", url);
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = ClientConfig::from_env()?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
    debug!("Using API at {}", config.api_url);

    let client = Arc::new(HttpStudyClient::new(reqwest::Client::new(), &config.api_url)?);
    let mut session = Session::new(client);
    session.auth.init(config.session_token.clone()).await;
    if session.auth.state().user.is_some() {
        session.enter_dashboard().await;
    } else {
        println!("Welcome to Teech. Sign in with /login or /signup, or type /help.");
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if !session.handle(&line).await {
            break;
        }
    }
    Ok(())
}
