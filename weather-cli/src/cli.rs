use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand, ValueEnum};
use std::sync::Arc;
use tracing::debug;
use weather_app_core::{
    ApiError, Config, FileStore, KeyValueStore, PersistSettings, RequestExecutor, ReqwestTransport,
    SessionManager, Store,
    model::{
        AuthCredentials, Preferences, ProfileUpdate, RegisterData, TemperatureUnit,
        ThemePreference, User, WeatherData, WeatherSearchResult,
    },
    store::{AuthAction, SearchAction, ThemeAction, WeatherAction},
};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather-app", version, about = "Weather app client")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// Commands that work on local state only.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Set the API base URL.
    Configure {
        /// Skip the prompt and use this URL.
        #[arg(long)]
        base_url: Option<String>,
    },

    /// Show or change the theme.
    Theme {
        #[arg(value_enum)]
        mode: Option<ThemeModeArg>,
    },

    /// Recent searches kept on this device.
    Recent {
        #[arg(long)]
        clear: bool,

        /// Forget one search term.
        #[arg(long)]
        remove: Option<String>,
    },

    #[command(flatten)]
    Online(OnlineCommand),
}

/// Commands that need a session against the API.
#[derive(Debug, Subcommand)]
pub enum OnlineCommand {
    /// Log in with email and password.
    Login {
        email: String,

        /// Prompted for when absent.
        #[arg(long)]
        password: Option<String>,
    },

    /// Create an account and log in.
    Register {
        #[arg(long)]
        first_name: String,

        #[arg(long)]
        last_name: String,

        #[arg(long)]
        email: String,

        #[arg(long)]
        password: Option<String>,
    },

    /// End the session locally and, when possible, on the server.
    Logout,

    /// Exchange the stored refresh token for a new access token.
    Refresh,

    /// Show session and local state.
    Status,

    /// Current weather for a city.
    Weather { city: String },

    /// Search weather for a location and remember the search.
    Search { location: String },

    /// Weather lookups recorded by the server for this account.
    History,

    /// Show the server-side profile.
    Profile,

    /// Change profile fields; omitted flags stay as they are.
    UpdateProfile {
        #[arg(long)]
        first_name: Option<String>,

        #[arg(long)]
        last_name: Option<String>,

        #[arg(long)]
        email: Option<String>,

        #[arg(long, value_enum)]
        unit: Option<UnitArg>,

        #[arg(long, value_enum)]
        theme: Option<ThemeArg>,

        #[arg(long)]
        notifications: Option<bool>,
    },

    /// Check that the API is reachable.
    Health,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum UnitArg {
    Celsius,
    Fahrenheit,
}

impl From<UnitArg> for TemperatureUnit {
    fn from(arg: UnitArg) -> Self {
        match arg {
            UnitArg::Celsius => TemperatureUnit::Celsius,
            UnitArg::Fahrenheit => TemperatureUnit::Fahrenheit,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ThemeArg {
    Light,
    Dark,
    System,
}

impl From<ThemeArg> for ThemePreference {
    fn from(arg: ThemeArg) -> Self {
        match arg {
            ThemeArg::Light => ThemePreference::Light,
            ThemeArg::Dark => ThemePreference::Dark,
            ThemeArg::System => ThemePreference::System,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ThemeModeArg {
    Light,
    Dark,
    System,
    Toggle,
}

impl Cli {
    pub async fn run(self, mut config: Config) -> Result<()> {
        match self.command {
            Command::Configure { base_url } => configure(&mut config, base_url),
            Command::Theme { mode } => {
                let (_, mut store) = open_store(&config).await?;
                theme(&mut store, mode).await
            }
            Command::Recent { clear, remove } => {
                let (_, mut store) = open_store(&config).await?;
                recent(&mut store, clear, remove).await
            }
            Command::Online(command) => {
                let (storage, mut store) = open_store(&config).await?;
                let mut session = open_session(&config, storage).await?;
                run_online(command, &mut session, &mut store).await
            }
        }
    }
}

fn configure(config: &mut Config, base_url: Option<String>) -> Result<()> {
    let url = match base_url {
        Some(url) => url,
        None => inquire::Text::new("API base URL:")
            .with_initial_value(config.base_url.as_deref().unwrap_or("http://localhost:3000"))
            .prompt()
            .context("Failed to read base URL")?,
    };

    config.set_base_url(&url);
    config.save()?;

    println!(
        "Saved base URL {} to {}",
        config.base_url()?,
        Config::config_file_path()?.display()
    );
    Ok(())
}

async fn open_store(config: &Config) -> Result<(Arc<dyn KeyValueStore>, Store)> {
    let path = config.storage_file()?;
    debug!(path = %path.display(), "opening local storage");
    let storage: Arc<dyn KeyValueStore> = Arc::new(FileStore::new(path));
    let store = Store::rehydrate(storage.clone(), PersistSettings::default()).await;
    Ok((storage, store))
}

async fn open_session(config: &Config, storage: Arc<dyn KeyValueStore>) -> Result<SessionManager> {
    let base_url = config.base_url()?;
    debug!(%base_url, "opening session");
    let executor = RequestExecutor::new(base_url, Arc::new(ReqwestTransport::new()));
    let mut session = SessionManager::new(executor, storage);
    session
        .initialize()
        .await
        .context("Failed to load stored session")?;
    Ok(session)
}

async fn run_online(
    command: OnlineCommand,
    session: &mut SessionManager,
    store: &mut Store,
) -> Result<()> {
    match command {
        OnlineCommand::Login { email, password } => {
            let password = password_or_prompt(password)?;
            store.dispatch(AuthAction::Requested).await;

            match session.login(&AuthCredentials { email, password }).await {
                Ok(response) => {
                    println!("Logged in as {}", response.user.display_name());
                    store.dispatch(AuthAction::from(response)).await;
                }
                Err(err) => return Err(record_auth_failure(store, err).await),
            }
        }
        OnlineCommand::Register {
            first_name,
            last_name,
            email,
            password,
        } => {
            let password = password_or_prompt(password)?;
            store.dispatch(AuthAction::Requested).await;

            let profile = RegisterData {
                first_name,
                last_name,
                email,
                password,
            };
            match session.register(&profile).await {
                Ok(response) => {
                    println!("Registered {}", response.user.display_name());
                    store.dispatch(AuthAction::from(response)).await;
                }
                Err(err) => return Err(record_auth_failure(store, err).await),
            }
        }
        OnlineCommand::Logout => {
            session.logout().await.context("Failed to clear stored session")?;
            store.dispatch(AuthAction::SignedOut).await;
            println!("Logged out");
        }
        OnlineCommand::Refresh => match session.refresh().await {
            Ok(token) => {
                store.dispatch(AuthAction::TokenRefreshed(token)).await;
                println!("Access token refreshed");
            }
            Err(err) if err.is_precondition() => {
                return Err(anyhow::Error::new(err)
                    .context("Hint: run `weather-app login` to start a new session"));
            }
            Err(err) => return Err(record_auth_failure(store, err).await),
        },
        OnlineCommand::Status => {
            let authenticated = session.is_authenticated().await?;
            match (authenticated, session.stored_user().await) {
                (true, Some(user)) => println!("Logged in as {} <{}>", user.display_name(), user.email),
                (true, None) => println!("Logged in"),
                (false, _) => println!("Not logged in"),
            }
            print_local_state(store);
        }
        OnlineCommand::Weather { city } => {
            store.dispatch(WeatherAction::Requested).await;
            match session.current_weather(&city).await {
                Ok(data) => {
                    print_weather(&data);
                    store.dispatch(WeatherAction::CurrentLoaded(data)).await;
                }
                Err(err) => return Err(record_weather_failure(store, err).await),
            }
        }
        OnlineCommand::Search { location } => {
            store.dispatch(SearchAction::Submitted(location.clone())).await;
            store.dispatch(WeatherAction::Requested).await;
            let outcome = session.search_weather(&location).await;
            store.dispatch(SearchAction::Completed).await;

            match outcome {
                Ok(result) => {
                    print_search(&result);
                    store.dispatch(WeatherAction::SearchLoaded(result)).await;
                }
                Err(err) => return Err(record_weather_failure(store, err).await),
            }
        }
        OnlineCommand::History => {
            store.dispatch(WeatherAction::Requested).await;
            match session.weather_history().await {
                Ok(items) => {
                    if items.is_empty() {
                        println!("No lookups recorded yet");
                    }
                    for item in &items {
                        println!(
                            "{}  {:<20} {:>6.1}°C  {}",
                            item.created_at.format("%Y-%m-%d %H:%M"),
                            item.location.name,
                            item.weather_data.temperature,
                            item.weather_data.description,
                        );
                    }
                    store.dispatch(WeatherAction::HistoryLoaded(items)).await;
                }
                Err(err) => return Err(record_weather_failure(store, err).await),
            }
        }
        OnlineCommand::Profile => {
            let user = session.profile().await.map_err(with_auth_hint)?;
            print_user(&user);
            store.dispatch(AuthAction::ProfileUpdated(user)).await;
        }
        OnlineCommand::UpdateProfile {
            first_name,
            last_name,
            email,
            unit,
            theme,
            notifications,
        } => {
            let mut update = ProfileUpdate {
                first_name,
                last_name,
                email,
                preferences: None,
            };

            if unit.is_some() || theme.is_some() || notifications.is_some() {
                let current = store
                    .state()
                    .auth
                    .user
                    .as_ref()
                    .and_then(|u| u.preferences.clone())
                    .unwrap_or(Preferences {
                        temperature_unit: TemperatureUnit::default(),
                        theme: ThemePreference::default(),
                        notifications: true,
                    });
                update.preferences = Some(Preferences {
                    temperature_unit: unit.map(Into::into).unwrap_or(current.temperature_unit),
                    theme: theme.map(Into::into).unwrap_or(current.theme),
                    notifications: notifications.unwrap_or(current.notifications),
                });
            }

            if update.is_empty() {
                anyhow::bail!("Nothing to update. Pass at least one field flag.");
            }

            let user = session.update_profile(&update).await.map_err(with_auth_hint)?;
            print_user(&user);
            store.dispatch(AuthAction::ProfileUpdated(user)).await;
        }
        OnlineCommand::Health => {
            let health = session.health_check().await?;
            println!(
                "API is {} (server time {})",
                health.status,
                health.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
            );
        }
    }

    Ok(())
}

async fn theme(store: &mut Store, mode: Option<ThemeModeArg>) -> Result<()> {
    let action = match mode {
        None => None,
        Some(ThemeModeArg::Toggle) => Some(ThemeAction::Toggle),
        Some(ThemeModeArg::Light) => Some(ThemeAction::SetMode(ThemePreference::Light)),
        Some(ThemeModeArg::Dark) => Some(ThemeAction::SetMode(ThemePreference::Dark)),
        Some(ThemeModeArg::System) => Some(ThemeAction::SetMode(ThemePreference::System)),
    };

    if let Some(action) = action {
        store.dispatch(action).await;
    }

    let theme = &store.state().theme;
    println!("Theme: {:?} (showing {:?})", theme.mode, theme.effective_scheme());
    Ok(())
}

async fn recent(store: &mut Store, clear: bool, remove: Option<String>) -> Result<()> {
    if clear {
        store.dispatch(SearchAction::HistoryCleared).await;
    }
    if let Some(term) = remove {
        store.dispatch(SearchAction::Removed(term)).await;
    }

    let history = &store.state().search.search_history;
    if history.is_empty() {
        println!("No recent searches");
    }
    for term in history {
        println!("{term}");
    }
    Ok(())
}

fn password_or_prompt(password: Option<String>) -> Result<String> {
    match password {
        Some(password) => Ok(password),
        None => inquire::Password::new("Password:")
            .without_confirmation()
            .prompt()
            .context("Failed to read password"),
    }
}

async fn record_auth_failure(store: &mut Store, err: ApiError) -> anyhow::Error {
    store.dispatch(AuthAction::Failed(err.to_string())).await;
    anyhow::Error::new(err)
}

async fn record_weather_failure(store: &mut Store, err: ApiError) -> anyhow::Error {
    store.dispatch(WeatherAction::Failed(err.to_string())).await;
    with_auth_hint(err)
}

fn with_auth_hint(err: ApiError) -> anyhow::Error {
    let unauthorized = err.status() == Some(401);
    let err = anyhow::Error::new(err);
    if unauthorized {
        err.context("Hint: run `weather-app refresh` or `weather-app login`")
    } else {
        err
    }
}

fn print_weather(data: &WeatherData) {
    println!("{}", data.location);
    println!("  {:.1}°C, {}", data.temperature, data.description);
    println!("  humidity {:.0}%, wind {:.1} m/s", data.humidity, data.wind_speed);
    println!(
        "  observed {}",
        data.timestamp
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M %Z")
    );
}

fn print_search(result: &WeatherSearchResult) {
    println!("{} ({})", result.location.name, result.location.country);
    println!(
        "  {:.1}°C, {}",
        result.weather_data.temperature, result.weather_data.description
    );
    println!(
        "  humidity {:.0}%, wind {:.1} m/s",
        result.weather_data.humidity, result.weather_data.wind_speed
    );
}

fn print_user(user: &User) {
    println!("{} <{}> (id {})", user.display_name(), user.email, user.id);
    if let Some(prefs) = &user.preferences {
        println!(
            "  units {:?}, theme {:?}, notifications {}",
            prefs.temperature_unit,
            prefs.theme,
            if prefs.notifications { "on" } else { "off" }
        );
    }
}

fn print_local_state(store: &Store) {
    let state = store.state();
    println!(
        "Theme: {:?}, recent searches: {}",
        state.theme.mode,
        state.search.search_history.len()
    );
}
