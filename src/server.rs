//! Web dashboard server.
//!
//! Serves the list-and-map earthquake dashboard:
//! - Axum for HTTP
//! - SSE (Server-Sent Events) pushing a full snapshot after every poll
//! - Leaflet map with severity-scaled markers
//!
//! The browser is a thin renderer: normalization, change detection, and
//! distance math all happen here, and each poll broadcasts one snapshot
//! JSON that the page redraws from.

use std::convert::Infallible;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{
        Html, IntoResponse, Json,
        sse::{Event, KeepAlive, Sse},
    },
    routing::{get, post},
};
use chrono::Utc;
use serde::Deserialize;
use tokio::sync::broadcast;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;

use crate::client::FeedClient;
use crate::detect::{PollState, Transition};
use crate::geo::{self, GeoPoint};
use crate::models::Quake;
use crate::normalize;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    pub feed_url: String,
    pub limit: usize,
    pub poll_interval: u64,
    /// Startup user position; the browser can override it via geolocation.
    pub position: Option<GeoPoint>,
}

/// Dashboard state shared between the poll task and the handlers.
///
/// One mutex, locked briefly around each snapshot rebuild. The timer poll
/// and a manual refresh may interleave; whoever finishes last wins, and
/// `PollState.polls` keeps the sequence observable in logs.
struct Dash {
    poll: PollState,
    quakes: Vec<Quake>,
    position: Option<GeoPoint>,
    last_error: Option<String>,
}

/// Shared application state.
#[derive(Clone)]
struct AppState {
    /// Channel broadcasting snapshot JSON to SSE clients
    tx: broadcast::Sender<String>,
    dash: Arc<Mutex<Dash>>,
    client: Arc<FeedClient>,
}

impl AppState {
    fn lock_dash(&self) -> std::sync::MutexGuard<'_, Dash> {
        self.dash.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Create the Axum router with all routes.
fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/stream", get(sse_handler))
        .route("/snapshot", get(snapshot_handler))
        .route("/refresh", post(refresh_handler))
        .route("/position", post(position_handler))
        .route("/health", get(health_handler))
        .with_state(state)
}

/// Start the dashboard server.
pub async fn run_server(config: ServerConfig) -> anyhow::Result<()> {
    let client = Arc::new(FeedClient::new(&config.feed_url, config.limit)?);
    let (tx, _rx) = broadcast::channel::<String>(100);

    let state = AppState {
        tx,
        dash: Arc::new(Mutex::new(Dash {
            poll: PollState::new(),
            quakes: Vec::new(),
            position: config.position,
            last_error: None,
        })),
        client,
    };

    // Spawn the background polling task
    let poll_state = state.clone();
    let poll_interval = config.poll_interval;
    tokio::spawn(async move {
        loop {
            poll_once(&poll_state).await;
            tokio::time::sleep(Duration::from_secs(poll_interval)).await;
        }
    });

    let app = create_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    tracing::info!("dashboard listening at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Run one poll: fetch, normalize, detect, broadcast a snapshot.
///
/// A failed fetch leaves the prior event list untouched and broadcasts
/// only a status change, so the page keeps showing the last good data.
async fn poll_once(state: &AppState) {
    let client = Arc::clone(&state.client);
    let fetched = tokio::task::spawn_blocking(move || client.fetch()).await;
    let now = Utc::now();

    let snapshot = match fetched {
        Ok(Ok(records)) => {
            let quakes = normalize::normalize_all(&records, now);
            let mut dash = state.lock_dash();
            let transition = dash.poll.check(&quakes, now);
            dash.quakes = quakes;
            dash.last_error = None;

            let new_quake = match &transition {
                Transition::NewQuake(q) => Some(q.clone()),
                Transition::None => None,
            };
            tracing::debug!(
                "poll #{}: {} events, new quake: {}",
                dash.poll.polls(),
                dash.quakes.len(),
                new_quake.is_some()
            );
            build_snapshot(&dash, new_quake.as_ref())
        }
        Ok(Err(e)) => {
            tracing::warn!("update failed, will retry: {e}");
            let mut dash = state.lock_dash();
            dash.last_error = Some(e.to_string());
            build_snapshot(&dash, None)
        }
        Err(e) => {
            tracing::warn!("poll task failed: {e}");
            return;
        }
    };

    let _ = state.tx.send(snapshot.to_string());
}

/// Render the dashboard state as one snapshot JSON value.
fn build_snapshot(dash: &Dash, new_quake: Option<&Quake>) -> serde_json::Value {
    let quakes: Vec<serde_json::Value> = dash
        .quakes
        .iter()
        .map(|q| quake_json(q, dash.position))
        .collect();

    let nearest = dash.position.and_then(|pos| {
        geo::nearest(pos, &dash.quakes).map(|(idx, dist)| {
            let q = &dash.quakes[idx];
            serde_json::json!({
                "place": q.place,
                "magnitude": q.magnitude,
                "distance_km": dist,
                "lat": q.latitude,
                "lon": q.longitude,
            })
        })
    });

    let status = match (&dash.last_error, dash.poll.last_poll()) {
        (Some(_), _) => "update failed".to_string(),
        (None, Some(t)) => format!("last update: {} UTC", t.format("%H:%M:%S")),
        (None, None) => "waiting for first poll".to_string(),
    };

    serde_json::json!({
        "quakes": quakes,
        "nearest": nearest,
        "status": status,
        "position": dash.position.map(|p| serde_json::json!({"lat": p.lat, "lon": p.lon})),
        "new_quake": new_quake.map(|q| quake_json(q, dash.position)),
    })
}

fn quake_json(quake: &Quake, position: Option<GeoPoint>) -> serde_json::Value {
    serde_json::json!({
        "id": quake.id,
        "magnitude": quake.magnitude,
        "place": quake.place,
        "time": quake.occurred_at.format("%Y-%m-%d %H:%M").to_string(),
        "lat": quake.latitude,
        "lon": quake.longitude,
        "color": quake.severity().marker_color(),
        "radius": quake.marker_radius(),
        "distance": geo::distance_text(position, quake),
    })
}

// ============================================================================
// Route Handlers
// ============================================================================

/// Main page handler - serves the HTML UI.
async fn index_handler() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// SSE stream handler for snapshot updates.
async fn sse_handler(
    State(state): State<AppState>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>> {
    let rx = state.tx.subscribe();
    let stream = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(json) => Some(Ok(Event::default().event("snapshot").data(json))),
        Err(_) => None,
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// Current snapshot, for initial page load.
async fn snapshot_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    let dash = state.lock_dash();
    Json(build_snapshot(&dash, None))
}

/// Manual refresh: poll now, outside the timer cadence.
async fn refresh_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    tracing::info!("manual refresh requested");
    poll_once(&state).await;
    let dash = state.lock_dash();
    Json(build_snapshot(&dash, None))
}

/// User position from the browser's geolocation prompt.
#[derive(Debug, Deserialize)]
struct PositionBody {
    lat: f64,
    lon: f64,
}

async fn position_handler(
    State(state): State<AppState>,
    Json(body): Json<PositionBody>,
) -> impl IntoResponse {
    if !(-90.0..=90.0).contains(&body.lat) || !(-180.0..=180.0).contains(&body.lon) {
        return (StatusCode::BAD_REQUEST, "position out of range").into_response();
    }

    let snapshot = {
        let mut dash = state.lock_dash();
        dash.position = Some(GeoPoint {
            lat: body.lat,
            lon: body.lon,
        });
        build_snapshot(&dash, None)
    };

    // Re-broadcast so every open tab picks up the distance column.
    let _ = state.tx.send(snapshot.to_string());
    Json(snapshot).into_response()
}

/// Health check endpoint.
async fn health_handler() -> &'static str {
    "OK"
}

// ============================================================================
// HTML Template (embedded for single-binary deployment)
// ============================================================================

const INDEX_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>QuakePulse</title>
<link rel="stylesheet" href="https://unpkg.com/leaflet@1.9.4/dist/leaflet.css" />
<script src="https://unpkg.com/leaflet@1.9.4/dist/leaflet.js"></script>
<style>
  :root {
    --bg: #0f1115; --panel: #171a21; --border: #262b35;
    --text: #e6e8ee; --muted: #8b93a3;
    --red: #b91c1c; --orange: #b45309; --green: #065f46;
  }
  * { margin: 0; padding: 0; box-sizing: border-box; }
  body {
    font-family: system-ui, -apple-system, sans-serif;
    background: var(--bg); color: var(--text);
    height: 100vh; display: flex; flex-direction: column;
  }
  header {
    display: flex; align-items: center; gap: 0.75rem;
    padding: 0.75rem 1rem; border-bottom: 1px solid var(--border);
  }
  header h1 { font-size: 1.1rem; font-weight: 600; }
  #status { color: var(--muted); font-size: 0.8rem; margin-left: auto; }
  button, label.toggle {
    background: var(--panel); color: var(--text);
    border: 1px solid var(--border); border-radius: 6px;
    padding: 0.35rem 0.75rem; font-size: 0.8rem; cursor: pointer;
  }
  button:hover { border-color: var(--muted); }
  main { flex: 1; display: flex; min-height: 0; }
  #list { width: 380px; overflow-y: auto; border-right: 1px solid var(--border); }
  #map { flex: 1; }
  .quake {
    display: flex; align-items: center; gap: 0.75rem;
    padding: 0.6rem 1rem; border-bottom: 1px solid var(--border);
  }
  .badge {
    min-width: 52px; text-align: center; font-weight: 700;
    border-radius: 6px; padding: 0.3rem 0.4rem; font-size: 0.85rem; color: #fff;
  }
  .mag-red { background: var(--red); }
  .mag-orange { background: var(--orange); }
  .mag-green { background: var(--green); }
  .quake .info { flex: 1; min-width: 0; }
  .quake .place { font-size: 0.85rem; font-weight: 600; }
  .quake .when, .quake .dist { font-size: 0.75rem; color: var(--muted); }
  #closest {
    padding: 0.5rem 1rem; font-size: 0.8rem; color: var(--muted);
    border-bottom: 1px solid var(--border);
  }
  #toast {
    position: fixed; bottom: 1rem; right: 1rem; display: none;
    background: var(--red); color: #fff; padding: 0.75rem 1rem;
    border-radius: 8px; font-size: 0.9rem;
  }
</style>
</head>
<body>
<header>
  <h1>QuakePulse</h1>
  <button id="refresh">Refresh</button>
  <button id="loc-btn">Use my location</button>
  <label class="toggle"><input type="checkbox" id="notify-toggle"> Notify</label>
  <span id="status">connecting…</span>
</header>
<div id="closest">No location set.</div>
<main>
  <div id="list"></div>
  <div id="map"></div>
</main>
<div id="toast"></div>
<script>
  const listEl = document.getElementById('list');
  const statusEl = document.getElementById('status');
  const closestEl = document.getElementById('closest');
  const toastEl = document.getElementById('toast');
  const notifyToggle = document.getElementById('notify-toggle');

  const map = L.map('map').setView([39.0, 35.0], 6);
  L.tileLayer('https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png', {
    attribution: '&copy; OpenStreetMap contributors'
  }).addTo(map);
  let markers = [];
  let userMarker = null;

  function magClass(m) {
    if (m >= 5) return 'mag-red';
    if (m >= 3.5) return 'mag-orange';
    return 'mag-green';
  }

  function render(snap) {
    statusEl.textContent = snap.status;
    listEl.innerHTML = '';
    markers.forEach(m => map.removeLayer(m));
    markers = [];

    snap.quakes.forEach(q => {
      const card = document.createElement('div');
      card.className = 'quake';
      card.innerHTML = `
        <div class="badge ${magClass(q.magnitude)}">M ${q.magnitude.toFixed(1)}</div>
        <div class="info">
          <div class="place">${q.place}</div>
          <div class="when">${q.time} UTC</div>
        </div>
        <div class="dist">${q.distance}</div>`;
      listEl.appendChild(card);

      const marker = L.circleMarker([q.lat, q.lon], {
        radius: q.radius, color: q.color, fillOpacity: 0.8
      }).addTo(map);
      marker.bindPopup(`<b>${q.place}</b><br>M ${q.magnitude.toFixed(1)}<br>${q.time} UTC`);
      markers.push(marker);
    });

    if (snap.position && !userMarker) {
      userMarker = L.marker([snap.position.lat, snap.position.lon], {title: 'You'}).addTo(map);
    }

    if (snap.nearest) {
      closestEl.innerHTML = `<strong>Nearest:</strong> ${snap.nearest.place}` +
        ` — ${snap.nearest.distance_km.toFixed(1)} km (M ${snap.nearest.magnitude.toFixed(1)})`;
    }

    if (snap.new_quake) announce(snap.new_quake);
  }

  function announce(q) {
    const msg = `New quake — M ${q.magnitude.toFixed(1)} — ${q.place}`;
    if (notifyToggle.checked && Notification.permission === 'granted') {
      new Notification(msg);
    } else {
      console.log('notify skipped:', msg);
    }
    toastEl.textContent = msg;
    toastEl.style.display = 'block';
    setTimeout(() => { toastEl.style.display = 'none'; }, 6000);
  }

  notifyToggle.addEventListener('change', async () => {
    if (notifyToggle.checked && Notification.permission !== 'granted') {
      await Notification.requestPermission();
      if (Notification.permission !== 'granted') {
        notifyToggle.checked = false;
        alert('Notification permission was not granted.');
      }
    }
  });

  document.getElementById('refresh').addEventListener('click', () => {
    fetch('/refresh', {method: 'POST'}).then(r => r.json()).then(render)
      .catch(() => { statusEl.textContent = 'update failed'; });
  });

  document.getElementById('loc-btn').addEventListener('click', () => {
    if (!navigator.geolocation) { alert('Geolocation is not supported.'); return; }
    navigator.geolocation.getCurrentPosition(pos => {
      fetch('/position', {
        method: 'POST',
        headers: {'Content-Type': 'application/json'},
        body: JSON.stringify({lat: pos.coords.latitude, lon: pos.coords.longitude})
      }).then(r => r.json()).then(snap => {
        render(snap);
        if (snap.nearest) map.setView([snap.nearest.lat, snap.nearest.lon], 8);
      });
    }, err => { alert('Could not get location: ' + err.message); }, {timeout: 10000});
  });

  fetch('/snapshot').then(r => r.json()).then(render);

  const source = new EventSource('/stream');
  source.addEventListener('snapshot', e => render(JSON.parse(e.data)));
  source.onerror = () => { statusEl.textContent = 'stream disconnected'; };
</script>
</body>
</html>
"##;
