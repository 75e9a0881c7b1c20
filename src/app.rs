use leptos::ev::SubmitEvent;
use leptos::prelude::*;
use leptos::server_fn::error::NoCustomError;
use leptos::task::spawn_local;
use leptos_meta::{provide_meta_context, MetaTags, Stylesheet, Title};
use leptos_router::{
    components::{Route, Router, Routes},
    hooks::use_query_map,
    path,
};

use crate::model::{CheckinCode, PlayerRecord, TeamList, COLOR_PAIRS, DEFAULT_COLOR_PAIR};

#[cfg(feature = "ssr")]
use crate::{checkin, config::AppContext, error::CheckinError};
#[cfg(feature = "ssr")]
use leptos::logging::error;

#[cfg(feature = "ssr")]
fn server_error(e: impl std::fmt::Display) -> ServerFnError<NoCustomError> {
    ServerFnError::ServerError(e.to_string())
}

// Logs a spreadsheet or image failure before handing it back to the page. Operator mistakes
// (bad ids, unknown colors) are only shown.
#[cfg(feature = "ssr")]
fn report(action: &str, e: CheckinError) -> ServerFnError<NoCustomError> {
    if matches!(
        e,
        CheckinError::Remote(_) | CheckinError::Image(_) | CheckinError::MissingColumn(_)
    ) {
        error!("{action} failed: {e}");
    }
    server_error(e)
}

#[cfg(feature = "ssr")]
async fn cookie_header() -> Result<Option<String>, ServerFnError<NoCustomError>> {
    use axum::http::HeaderMap;
    use leptos_axum::extract;

    let headers: HeaderMap = extract().await.map_err(server_error)?;
    Ok(headers
        .get(axum::http::header::COOKIE)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string))
}

#[cfg(feature = "ssr")]
async fn require_session(ctx: &AppContext) -> Result<(), ServerFnError<NoCustomError>> {
    let cookies = cookie_header().await?;
    checkin::authorize(ctx, cookies.as_deref(), chrono::Utc::now()).map_err(server_error)
}

#[cfg(feature = "ssr")]
fn set_cookie(cookie: &str) -> Result<(), ServerFnError<NoCustomError>> {
    use leptos_axum::ResponseOptions;
    let resp: ResponseOptions = expect_context();
    resp.insert_header(
        axum::http::header::SET_COOKIE,
        axum::http::HeaderValue::from_str(cookie).map_err(server_error)?,
    );
    Ok(())
}

#[server(GetTeams)]
pub async fn get_teams() -> Result<TeamList, ServerFnError<NoCustomError>> {
    let ctx: AppContext = expect_context();
    checkin::team_list(&ctx)
        .await
        .map_err(|e| report("Listing teams", e))
}

#[server(GetRoster)]
pub async fn get_roster(team: String) -> Result<Vec<PlayerRecord>, ServerFnError<NoCustomError>> {
    let ctx: AppContext = expect_context();
    checkin::roster(&ctx, &team)
        .await
        .map_err(|e| report("Loading roster", e))
}

#[server(CheckinLogin)]
pub async fn checkin_login(
    username: String,
    password: String,
) -> Result<(), ServerFnError<NoCustomError>> {
    let ctx: AppContext = expect_context();
    let cookie =
        checkin::login(&ctx, &username, &password, chrono::Utc::now()).map_err(server_error)?;
    set_cookie(&cookie)
}

#[server(CheckinLogout)]
pub async fn checkin_logout() -> Result<(), ServerFnError<NoCustomError>> {
    set_cookie(&crate::session::expired_session_cookie())
}

#[server(IsCheckinAuthenticated)]
pub async fn is_checkin_authenticated() -> Result<bool, ServerFnError<NoCustomError>> {
    let ctx: AppContext = expect_context();
    let cookies = cookie_header().await?;
    Ok(checkin::has_session(
        &ctx,
        cookies.as_deref(),
        chrono::Utc::now(),
    ))
}

#[server(GetCheckinPlayer)]
pub async fn get_checkin_player(
    team: String,
    player_id: String,
) -> Result<PlayerRecord, ServerFnError<NoCustomError>> {
    let ctx: AppContext = expect_context();
    require_session(&ctx).await?;
    checkin::checkin_player(&ctx, &team, &player_id)
        .await
        .map_err(|e| report("Loading player", e))
}

#[server(UpdateWristBand)]
pub async fn update_wrist_band(
    team: String,
    player_id: String,
    wrist_band: String,
) -> Result<PlayerRecord, ServerFnError<NoCustomError>> {
    let ctx: AppContext = expect_context();
    require_session(&ctx).await?;
    checkin::save_wrist_band(&ctx, &team, &player_id, &wrist_band)
        .await
        .map_err(|e| report("Updating wrist band", e))
}

#[server(GenerateCheckinCode)]
pub async fn generate_checkin_code(
    team: String,
    player_index: usize,
    colors: String,
) -> Result<CheckinCode, ServerFnError<NoCustomError>> {
    let ctx: AppContext = expect_context();
    checkin::checkin_code(&ctx, &team, player_index, &colors)
        .await
        .map_err(|e| report("Generating code", e))
}

/// The message carried by a server error, without the transport prefix.
fn error_text(err: &ServerFnError<NoCustomError>) -> String {
    match err {
        ServerFnError::ServerError(message) => message.clone(),
        other => other.to_string(),
    }
}

pub fn shell(options: LeptosOptions) -> impl IntoView {
    view! {
        <!DOCTYPE html>
        <html lang="en">
            <head>
                <meta charset="utf-8" />
                <meta name="viewport" content="width=device-width, initial-scale=1" />
                <AutoReload options=options.clone() />
                <HydrationScripts options />
                <MetaTags />
            </head>
            <body>
                <App />
            </body>
        </html>
    }
}

#[component]
pub fn App() -> impl IntoView {
    // Provides context that manages stylesheets, titles, meta tags, etc.
    provide_meta_context();

    view! {
        <Stylesheet id="leptos" href="/pkg/player-qr-checkin.css" />
        <Title text="Player QR Check-in" />

        <Router>
            <main>
                <Routes fallback=|| "Page not found.".into_view()>
                    <Route path=path!("/") view=Home />
                </Routes>
            </main>
        </Router>
    }
}

// `?checkin` switches the page into the operator's check-in view.
#[component]
fn Home() -> impl IntoView {
    let query = use_query_map();

    move || {
        if query.with(|q| q.get("checkin").is_some()) {
            view! { <CheckinMode /> }.into_any()
        } else {
            view! { <BrowseMode /> }.into_any()
        }
    }
}

#[component]
fn CheckinMode() -> impl IntoView {
    let query = use_query_map();
    let auth = Resource::new(|| (), |_| is_checkin_authenticated());
    let notice = RwSignal::new(String::new());

    let logout = move |_| {
        spawn_local(async move {
            if checkin_logout().await.is_ok() {
                notice.set(String::new());
                auth.refetch();
            }
        });
    };

    view! {
        <div class="checkin">
            <Suspense fallback=|| {
                view! { "Checking login..." }
            }>
                {move || match auth.get() {
                    Some(Ok(true)) => {
                        let team = query.with(|q| q.get("teamname"));
                        let player_id = query.with(|q| q.get("playerid"));
                        view! {
                            {move || {
                                (!notice.get().is_empty())
                                    .then(|| view! { <p class="success">{notice.get()}</p> })
                            }}
                            {match (team, player_id) {
                                (Some(team), Some(player_id)) => {
                                    view! { <PlayerCheckin team player_id /> }.into_any()
                                }
                                _ => {
                                    view! {
                                        <p class="info">
                                            "Scan a player's check-in code to look them up."
                                        </p>
                                    }
                                        .into_any()
                                }
                            }}
                            <button class="btn-logout" on:click=logout>
                                "Log out"
                            </button>
                        }
                            .into_any()
                    }
                    Some(Ok(false)) => view! { <LoginForm auth notice /> }.into_any(),
                    Some(Err(e)) => {
                        view! { <p class="error">"An error occurred: " {error_text(&e)}</p> }
                            .into_any()
                    }
                    None => view! {}.into_any(),
                }}
            </Suspense>
        </div>
    }
}

#[component]
fn LoginForm(
    auth: Resource<Result<bool, ServerFnError<NoCustomError>>>,
    notice: RwSignal<String>,
) -> impl IntoView {
    let username = RwSignal::new(String::new());
    let password = RwSignal::new(String::new());
    let error = RwSignal::new(String::new());

    let submit = move |ev: SubmitEvent| {
        ev.prevent_default();
        let u = username.get();
        let p = password.get();
        spawn_local(async move {
            match checkin_login(u, p).await {
                Ok(_) => {
                    error.set(String::new());
                    notice.set("Logged in successfully.".to_string());
                    auth.refetch();
                }
                Err(e) => error.set(error_text(&e)),
            }
        });
    };

    view! {
        <div class="login">
            <p class="info">"Authentication Required for Check-in"</p>
            <form on:submit=submit>
                <label>
                    "Username "
                    <input type="text" on:input=move |ev| username.set(event_target_value(&ev)) />
                </label>
                <label>
                    "Password "
                    <input
                        type="password"
                        on:input=move |ev| password.set(event_target_value(&ev))
                    />
                </label>
                <button type="submit">"Login"</button>
            </form>
            {move || (!error.get().is_empty()).then(|| view! { <p class="error">{error.get()}</p> })}
        </div>
    }
}

#[component]
fn PlayerCheckin(team: String, player_id: String) -> impl IntoView {
    let lookup = (team.clone(), player_id.clone());
    let player = Resource::new(
        move || lookup.clone(),
        |(team, player_id)| get_checkin_player(team, player_id),
    );

    view! {
        <Suspense fallback=|| {
            view! { "Loading player..." }
        }>
            {move || {
                player
                    .get()
                    .map(|result| match result {
                        Ok(record) => {
                            let current = record.wrist_band().to_string();
                            view! {
                                <h2>
                                    "Selected Player Details for " {team.clone()} ", Player ID "
                                    {player_id.clone()} ":"
                                </h2>
                                <PlayerDetails record />
                                <WristBandEditor
                                    team=team.clone()
                                    player_id=player_id.clone()
                                    current
                                />
                            }
                                .into_any()
                        }
                        Err(e) => view! { <p class="error">{error_text(&e)}</p> }.into_any(),
                    })
            }}
        </Suspense>
    }
}

#[component]
fn WristBandEditor(team: String, player_id: String, current: String) -> impl IntoView {
    let target = StoredValue::new((team, player_id));
    let wrist_band = RwSignal::new(current);
    let saving = RwSignal::new(false);
    let outcome = RwSignal::new(None::<Result<PlayerRecord, String>>);

    let submit = move |ev: SubmitEvent| {
        ev.prevent_default();
        let (team, player_id) = target.get_value();
        let text = wrist_band.get();
        saving.set(true);
        spawn_local(async move {
            let result = update_wrist_band(team, player_id, text)
                .await
                .map_err(|e| error_text(&e));
            outcome.set(Some(result));
            saving.set(false);
        });
    };

    view! {
        <form class="wrist-band" on:submit=submit>
            <label>
                "Edit Wrist Band Detail"
                <textarea
                    prop:value=move || wrist_band.get()
                    on:input=move |ev| wrist_band.set(event_target_value(&ev))
                >
                    {wrist_band.get_untracked()}
                </textarea>
            </label>
            <button type="submit" disabled=move || saving.get()>
                "Update Wrist Band"
            </button>
        </form>
        {move || {
            outcome
                .get()
                .map(|result| match result {
                    Ok(record) => {
                        view! {
                            <p class="success">"Wrist Band updated successfully!"</p>
                            <h3>"Updated Player Details:"</h3>
                            <PlayerDetails record />
                        }
                            .into_any()
                    }
                    Err(message) => {
                        view! { <p class="error">"An error occurred: " {message}</p> }.into_any()
                    }
                })
        }}
    }
}

#[component]
fn PlayerDetails(record: PlayerRecord) -> impl IntoView {
    view! {
        <table class="player-details">
            <tbody>
                {record
                    .fields
                    .into_iter()
                    .map(|(column, value)| {
                        view! {
                            <tr>
                                <th>{column}</th>
                                <td>{value}</td>
                            </tr>
                        }
                    })
                    .collect_view()}
            </tbody>
        </table>
    }
}

/// What the player section of the browse view shows for a loaded roster.
#[derive(Debug, Clone, PartialEq)]
enum RosterView {
    /// No team is selected (teams failed to load or the spreadsheet has no worksheets).
    NoTeam,
    Empty,
    Players {
        players: Vec<PlayerRecord>,
        selected: usize,
    },
}

// Defaults to the most recently added player.
fn roster_view(roster: Option<Vec<PlayerRecord>>, chosen: Option<usize>) -> RosterView {
    match roster {
        None => RosterView::NoTeam,
        Some(players) if players.is_empty() => RosterView::Empty,
        Some(players) => {
            let selected = chosen
                .filter(|i| *i < players.len())
                .unwrap_or(players.len() - 1);
            RosterView::Players { players, selected }
        }
    }
}

#[component]
fn BrowseMode() -> impl IntoView {
    let teams = Resource::new(|| (), |_| get_teams());
    let chosen_team = RwSignal::new(None::<String>);
    let chosen_player = RwSignal::new(None::<usize>);

    // The operator's pick, or the first worksheet until they choose one.
    let team = Memo::new(move |_| {
        chosen_team.get().or_else(|| {
            teams
                .get()
                .and_then(Result::ok)
                .and_then(|list| list.teams.first().cloned())
        })
    });
    // Stays `None` until a team is known, so nothing about players is shown without one.
    let roster = Resource::new(
        move || team.get(),
        |team| async move {
            match team {
                Some(team) => get_roster(team).await.map(Some),
                None => Ok(None),
            }
        },
    );

    view! {
        <div class="browse">
            <Suspense fallback=|| {
                view! { "Loading teams..." }
            }>
                {move || {
                    teams
                        .get()
                        .map(|result| match result {
                            Ok(list) => {
                                let current = team.get().unwrap_or_default();
                                view! {
                                    <h1>{list.spreadsheet}</h1>
                                    <label>
                                        "Select a team "
                                        <select on:change=move |ev| {
                                            chosen_team.set(Some(event_target_value(&ev)));
                                            chosen_player.set(None);
                                        }>
                                            {list
                                                .teams
                                                .into_iter()
                                                .map(|name| {
                                                    let selected = name == current;
                                                    let value = name.clone();
                                                    view! {
                                                        <option value=value selected=selected>
                                                            {name}
                                                        </option>
                                                    }
                                                })
                                                .collect_view()}
                                        </select>
                                    </label>
                                }
                                    .into_any()
                            }
                            Err(e) => {
                                view! { <p class="error">"An error occurred: " {error_text(&e)}</p> }
                                    .into_any()
                            }
                        })
                }}
            </Suspense>
            <Suspense fallback=|| {
                view! { "Loading players..." }
            }>
                {move || {
                    roster
                        .get()
                        .map(|result| match result {
                            Ok(roster) => match roster_view(roster, chosen_player.get()) {
                                RosterView::NoTeam => view! {}.into_any(),
                                RosterView::Empty => {
                                    view! {
                                        <label>
                                            "Select a player: " <select disabled=true></select>
                                        </label>
                                        <p class="info">"No players found for this team."</p>
                                    }
                                        .into_any()
                                }
                                RosterView::Players { players, selected } => {
                                    let record = players[selected].clone();
                                    let team_name = team.get().unwrap_or_default();
                                    view! {
                                        <label>
                                            "Select a player: "
                                            <select on:change=move |ev| {
                                                chosen_player.set(event_target_value(&ev).parse().ok());
                                            }>
                                                {players
                                                    .iter()
                                                    .enumerate()
                                                    .map(|(i, player)| {
                                                        view! {
                                                            <option value=i.to_string() selected={i == selected}>
                                                                {player.player_name().to_string()}
                                                            </option>
                                                        }
                                                    })
                                                    .collect_view()}
                                            </select>
                                        </label>
                                        <h2>"Selected Player Details:"</h2>
                                        <PlayerDetails record />
                                        <CodeGenerator team=team_name player_index=selected />
                                    }
                                        .into_any()
                                }
                            },
                            Err(e) => {
                                view! { <p class="error">"An error occurred: " {error_text(&e)}</p> }
                                    .into_any()
                            }
                        })
                }}
            </Suspense>
        </div>
    }
}

#[component]
fn CodeGenerator(team: String, player_index: usize) -> impl IntoView {
    let team = StoredValue::new(team);
    let colors = RwSignal::new(DEFAULT_COLOR_PAIR.to_string());
    let generating = RwSignal::new(false);
    let code = RwSignal::new(None::<Result<CheckinCode, String>>);

    let generate = move |_| {
        let team = team.get_value();
        let pair = colors.get_untracked();
        generating.set(true);
        spawn_local(async move {
            let result = generate_checkin_code(team, player_index, pair)
                .await
                .map_err(|e| error_text(&e));
            code.set(Some(result));
            generating.set(false);
        });
    };

    view! {
        <div class="code-generator">
            <label>
                "Select a color pair: "
                <select on:change=move |ev| colors.set(event_target_value(&ev))>
                    {COLOR_PAIRS
                        .iter()
                        .map(|pair| {
                            view! {
                                <option value=pair.name selected={pair.name == DEFAULT_COLOR_PAIR}>
                                    {pair.name}
                                </option>
                            }
                        })
                        .collect_view()}
                </select>
            </label>
            <button on:click=generate disabled=move || generating.get()>
                "Generate QR Code for Check-in"
            </button>
            {move || {
                code.get()
                    .map(|result| match result {
                        Ok(code) => view! { <CodeCard code /> }.into_any(),
                        Err(message) => {
                            view! { <p class="error">"An error occurred: " {message}</p> }.into_any()
                        }
                    })
            }}
        </div>
    }
}

#[component]
fn CodeCard(code: CheckinCode) -> impl IntoView {
    let photo = match code.photo_url {
        Some(url) => {
            view! {
                <img src=url alt="Player Photo" />
                <figcaption>"Player Photo"</figcaption>
            }
                .into_any()
        }
        None => view! { <p>"Player's photo not found"</p> }.into_any(),
    };

    view! {
        <div class="code-columns">
            <figure class="column">{photo}</figure>
            <figure class="column">
                <img src=code.image_data_uri.clone() alt="Generated QR Code" />
                <figcaption>"Generated QR Code"</figcaption>
                <a class="download" href=code.image_data_uri download=code.download_name>
                    "Download QR Code"
                </a>
                <p class="checkin-url">{code.checkin_url}</p>
            </figure>
        </div>
    }
}
