//! Interactive terminal front end: the connect form, the request prompt and
//! the confirmation prompt.

use std::io::Write;

use anyhow::{Context, Result};
use clap::Parser;
use smol::io::{AsyncBufReadExt, BufReader};

use sqlprompt::Config;
use sqlprompt::render::{render_result, render_schema};
use sqlprompt::services::completion::CompletionService;
use sqlprompt::services::database::{ConnectForm, Connector, Dialect, DialectConnector};
use sqlprompt::state::{App, GeneratedSql, RequestContext, SessionStore};

/// Ask a MySQL or PostgreSQL database questions in plain English
#[derive(Parser, Debug, Default)]
#[command(name = "sqlprompt")]
#[command(version)]
#[command(about = "Natural-language SQL assistant", long_about = None)]
pub struct Cli {
    /// Database type: MySQL or PostgreSQL
    #[arg(long = "dialect")]
    pub dialect: Option<String>,

    /// Database host, optionally with :port
    #[arg(long = "host")]
    pub host: Option<String>,

    #[arg(long = "username")]
    pub username: Option<String>,

    #[arg(long = "password")]
    pub password: Option<String>,

    /// Database name
    #[arg(long = "database")]
    pub database: Option<String>,

    /// Chat-completions endpoint (overrides SQLPROMPT_COMPLETION_URL)
    #[arg(long = "completion-url")]
    pub completion_url: Option<String>,
}

impl Cli {
    /// Connect form values prefilled from flags.
    pub fn connect_form(&self) -> ConnectForm {
        ConnectForm {
            dialect: self.dialect.clone().unwrap_or_default(),
            host: self.host.clone().unwrap_or_default(),
            username: self.username.clone().unwrap_or_default(),
            password: self.password.clone().unwrap_or_default(),
            database: self.database.clone().unwrap_or_default(),
        }
    }
}

/// One line typed at the request prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Empty,
    Quit,
    Help,
    Schema,
    Connect,
    Sql(String),
    Ask(String),
}

impl Command {
    pub fn parse(line: &str) -> Command {
        let line = line.trim();
        match line {
            "" => Command::Empty,
            ":quit" | ":q" | ":exit" => Command::Quit,
            ":help" | ":h" => Command::Help,
            ":schema" => Command::Schema,
            ":connect" => Command::Connect,
            _ => match line.strip_prefix(":sql") {
                Some(rest) if rest.is_empty() || rest.starts_with(char::is_whitespace) => {
                    Command::Sql(rest.trim().to_string())
                }
                _ => Command::Ask(line.to_string()),
            },
        }
    }
}

/// What the confirmation prompt decided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Confirmation {
    Run(String),
    Skip,
}

impl Confirmation {
    /// Enter runs a suggestion as shown, `:skip` discards it, anything else
    /// replaces it. Enter on a failed generation skips.
    pub fn parse(line: &str, proposed: &GeneratedSql) -> Confirmation {
        let line = line.trim();
        match (line, proposed) {
            ("", GeneratedSql::Suggestion(sql)) if !sql.trim().is_empty() => {
                Confirmation::Run(sql.clone())
            }
            ("", _) | (":skip", _) => Confirmation::Skip,
            _ => Confirmation::Run(line.to_string()),
        }
    }
}

/// Value for a form field. Enter keeps `current`; the password is taken
/// verbatim, every other field is trimmed.
fn form_answer(line: &str, current: &str, secret: bool) -> String {
    if line.is_empty() || (!secret && line.trim().is_empty()) {
        current.to_string()
    } else if secret {
        line.to_string()
    } else {
        line.trim().to_string()
    }
}

const HELP: &str = "\
Type a question in plain English to have SQL generated for it.

Commands:
  :schema          Show the reflected schema
  :connect         Connect to a different database
  :sql <statement> Run a statement of your own (after confirmation)
  :help            Show this help
  :quit            Exit
";

/// Line-oriented stdin reader.
struct Terminal {
    reader: BufReader<smol::Unblock<std::io::Stdin>>,
}

impl Terminal {
    fn new() -> Self {
        Self {
            reader: BufReader::new(smol::Unblock::new(std::io::stdin())),
        }
    }

    /// Prints `prompt` and reads one line. `None` on end of input.
    async fn prompt(&mut self, prompt: &str) -> Result<Option<String>> {
        print!("{}", prompt);
        std::io::stdout().flush().context("Failed to write prompt")?;

        let mut line = String::new();
        let read = self
            .reader
            .read_line(&mut line)
            .await
            .context("Failed to read from stdin")?;
        if read == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }

    /// Prompts for one form field. Enter keeps the current value.
    async fn field(&mut self, label: &str, current: &str, secret: bool) -> Result<Option<String>> {
        let prompt = match (current.is_empty(), secret) {
            (true, _) => format!("{}: ", label),
            (false, true) => format!("{} [********]: ", label),
            (false, false) => format!("{} [{}]: ", label, current),
        };

        Ok(self
            .prompt(&prompt)
            .await?
            .map(|line| form_answer(&line, current, secret)))
    }
}

pub async fn run(cli: Cli, config: Config) -> Result<()> {
    if config.api_key.is_none() {
        tracing::warn!(
            "{} is not set; SQL generation will fail until it is",
            sqlprompt::config::API_KEY_VAR
        );
    }

    let app = App::new(DialectConnector, config.completion_client());
    let store = SessionStore::new();
    let session_id = store.create().await;
    let mut terminal = Terminal::new();

    tracing::debug!(?config, %session_id, "Starting");

    let mut form = cli.connect_form();
    let mut ask_all = !form_is_complete(&form);

    loop {
        let mut ctx = store.begin_request(session_id).await;
        let connected = connect_form(&app, &mut terminal, &mut ctx, &mut form, ask_all).await?;
        store.end_request(ctx).await;
        if !connected {
            return Ok(());
        }

        match request_loop(&app, &store, session_id, &mut terminal).await? {
            Next::Reconnect => ask_all = true,
            Next::Quit => break,
        }
    }

    store.remove(session_id).await;
    Ok(())
}

enum Next {
    Reconnect,
    Quit,
}

fn form_is_complete(form: &ConnectForm) -> bool {
    !form.dialect.is_empty()
        && !form.host.is_empty()
        && !form.username.is_empty()
        && !form.database.is_empty()
}

/// Shows the connect form until a connection succeeds. Returns false on
/// end of input.
async fn connect_form<C, L>(
    app: &App<C, L>,
    terminal: &mut Terminal,
    ctx: &mut RequestContext,
    form: &mut ConnectForm,
    mut ask_all: bool,
) -> Result<bool>
where
    C: Connector,
    L: CompletionService,
{
    loop {
        if ask_all {
            let dialects: Vec<&str> = Dialect::all().iter().map(|d| d.as_str()).collect();
            let dialect_label = format!("Database type ({})", dialects.join("/"));

            let fields: [(&str, &mut String, bool); 5] = [
                (dialect_label.as_str(), &mut form.dialect, false),
                ("Host", &mut form.host, false),
                ("Username", &mut form.username, false),
                ("Password", &mut form.password, true),
                ("Database", &mut form.database, false),
            ];
            for (label, value, secret) in fields {
                match terminal.field(label, value, secret).await? {
                    Some(answer) => *value = answer,
                    None => return Ok(false),
                }
            }
        }

        match app.connect(ctx, form.clone()).await {
            Ok(schema) => {
                println!("\nConnected. Schema:\n");
                print!("{}", render_schema(&schema));
                println!("\nType :help for commands.\n");
                return Ok(true);
            }
            Err(e) => {
                println!("Failed to connect: {}\n", e);
                ask_all = true;
            }
        }
    }
}

async fn request_loop<C, L>(
    app: &App<C, L>,
    store: &SessionStore,
    session_id: uuid::Uuid,
    terminal: &mut Terminal,
) -> Result<Next>
where
    C: Connector,
    L: CompletionService,
{
    loop {
        let Some(line) = terminal.prompt("sqlprompt> ").await? else {
            println!();
            return Ok(Next::Quit);
        };

        let ctx = store.begin_request(session_id).await;
        let proposed = match Command::parse(&line) {
            Command::Empty => continue,
            Command::Quit => return Ok(Next::Quit),
            Command::Help => {
                print!("{}", HELP);
                continue;
            }
            Command::Connect => return Ok(Next::Reconnect),
            Command::Schema => {
                match ctx.schema() {
                    Ok(schema) => print!("{}", render_schema(schema)),
                    Err(e) => println!("Error: {}", e),
                }
                continue;
            }
            Command::Sql(sql) => GeneratedSql::Suggestion(sql),
            Command::Ask(request) => match app.generate_sql(&ctx, &request).await {
                Ok(generated) => generated,
                Err(e) => {
                    println!("Error: {}", e);
                    continue;
                }
            },
        };

        confirm_and_execute(app, &ctx, terminal, &proposed).await?;
        store.end_request(ctx).await;
    }
}

async fn confirm_and_execute<C, L>(
    app: &App<C, L>,
    ctx: &RequestContext,
    terminal: &mut Terminal,
    proposed: &GeneratedSql,
) -> Result<()>
where
    C: Connector,
    L: CompletionService,
{
    let prompt = if proposed.is_suggestion() {
        println!("\nGenerated SQL:\n  {}\n", proposed.display_text());
        "Press Enter to run, type replacement SQL, or :skip > "
    } else {
        println!("\nGeneration failed:\n  {}\n", proposed.display_text());
        "Type SQL to run, or press Enter to skip > "
    };

    let Some(answer) = terminal.prompt(prompt).await? else {
        return Ok(());
    };

    let sql = match Confirmation::parse(&answer, proposed) {
        Confirmation::Run(sql) => sql,
        Confirmation::Skip => {
            println!("Skipped.\n");
            return Ok(());
        }
    };

    match app.execute(ctx, &sql).await {
        Ok(result) => println!("\n{}", render_result(&result)),
        Err(e) => println!("Error: {}\n", e),
    }
    Ok(())
}
