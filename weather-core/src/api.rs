use serde::de::DeserializeOwned;
use tracing::debug;

use crate::{
    error::ApiError,
    executor::{ApiCall, decode, endpoint},
    model::{
        ApiEnvelope, HealthStatus, Location, ProfileUpdate, User, WeatherData, WeatherHistoryItem,
        WeatherSearchResult, WeatherSnapshot,
    },
    session::SessionManager,
};

/// Placeholder geography for search results. The remote service has no
/// search endpoint yet, so search is served from current weather, which
/// reports neither country nor coordinates.
const UNKNOWN_COUNTRY: &str = "Unknown";
const DEFAULT_ICON: &str = "default";

impl SessionManager {
    pub async fn current_weather(&self, city: &str) -> Result<WeatherData, ApiError> {
        let call = ApiCall::get(endpoint::WEATHER_CURRENT).query("city", city);
        self.send_enveloped(call).await
    }

    /// Looks up weather for a free-form location and shapes it as a search result.
    pub async fn search_weather(&self, location: &str) -> Result<WeatherSearchResult, ApiError> {
        // TODO: switch to /api/weather/search once the service exposes it and drop the placeholders.
        debug!(%location, "serving search from current weather");
        let data = self.current_weather(location).await?;
        Ok(search_result_from_current(data))
    }

    pub async fn weather_history(&self) -> Result<Vec<WeatherHistoryItem>, ApiError> {
        self.send_enveloped(ApiCall::get(endpoint::WEATHER_HISTORY))
            .await
    }

    pub async fn profile(&self) -> Result<User, ApiError> {
        decode(self.send(ApiCall::get(endpoint::PROFILE)).await?)
    }

    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<User, ApiError> {
        let call = ApiCall::put(endpoint::PROFILE).json(update)?;
        decode(self.send(call).await?)
    }

    pub async fn health_check(&self) -> Result<HealthStatus, ApiError> {
        let call = ApiCall::get(endpoint::HEALTH).without_auth();
        decode(self.send(call).await?)
    }

    async fn send_enveloped<T: DeserializeOwned>(&self, call: ApiCall) -> Result<T, ApiError> {
        let endpoint = call.endpoint.clone();
        let envelope: ApiEnvelope<T> = decode(self.send(call).await?)?;
        envelope.data.ok_or(ApiError::MissingData { endpoint })
    }
}

fn search_result_from_current(data: WeatherData) -> WeatherSearchResult {
    WeatherSearchResult {
        location: Location {
            name: data.location,
            country: UNKNOWN_COUNTRY.to_string(),
            lat: 0.0,
            lon: 0.0,
        },
        weather_data: WeatherSnapshot {
            temperature: data.temperature,
            description: data.description,
            humidity: data.humidity,
            wind_speed: data.wind_speed,
            icon: DEFAULT_ICON.to_string(),
        },
        created_at: data.timestamp,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        executor::RequestExecutor, model::AuthCredentials, storage::MemoryStore,
        testing::ScriptedTransport,
    };
    use reqwest::header::AUTHORIZATION;
    use serde_json::json;
    use std::sync::Arc;

    fn session(transport: &Arc<ScriptedTransport>) -> SessionManager {
        let executor = RequestExecutor::new("http://api.test", transport.clone());
        SessionManager::new(executor, Arc::new(MemoryStore::new()))
    }

    fn current_reply() -> serde_json::Value {
        json!({
            "success": true,
            "data": {
                "location": "Oslo",
                "temperature": 3.5,
                "description": "light snow",
                "humidity": 81,
                "windSpeed": 4.2,
                "timestamp": "2024-01-01T10:00:00Z"
            }
        })
    }

    #[tokio::test]
    async fn current_weather_unwraps_envelope() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond(200, current_reply());

        let data = session(&transport).current_weather("Oslo").await.unwrap();

        assert_eq!(data.location, "Oslo");
        assert_eq!(data.humidity, 81.0);
        let request = transport.last_request().unwrap();
        assert_eq!(request.url.query(), Some("city=Oslo"));
    }

    #[tokio::test]
    async fn search_uses_placeholder_geography() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond(200, current_reply());

        let result = session(&transport).search_weather("Oslo").await.unwrap();

        assert_eq!(result.location.name, "Oslo");
        assert_eq!(result.location.country, "Unknown");
        assert_eq!((result.location.lat, result.location.lon), (0.0, 0.0));
        assert_eq!(result.weather_data.icon, "default");
        assert_eq!(transport.last_request().unwrap().url.path(), endpoint::WEATHER_CURRENT);
    }

    #[tokio::test]
    async fn envelope_without_data_is_an_error() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond(200, json!({ "success": false, "message": "nothing here" }));

        let err = session(&transport).weather_history().await.unwrap_err();

        match err {
            ApiError::MissingData { endpoint } => assert_eq!(endpoint, "/api/weather/history"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn update_profile_puts_partial_body_with_credentials() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond(
            200,
            json!({ "success": true, "user": { "id": "1" }, "token": "T1" }),
        );
        transport.respond(200, json!({ "id": "1", "firstName": "Grace" }));

        let mut session = session(&transport);
        session
            .login(&AuthCredentials {
                email: "a@b.com".into(),
                password: "x".into(),
            })
            .await
            .unwrap();

        let update = ProfileUpdate {
            first_name: Some("Grace".into()),
            ..Default::default()
        };
        let user = session.update_profile(&update).await.unwrap();

        assert_eq!(user.first_name, "Grace");
        let request = transport.last_request().unwrap();
        assert_eq!(request.method, crate::transport::Method::Put);
        assert_eq!(request.body, Some(json!({ "firstName": "Grace" })));
        assert_eq!(request.headers.get(AUTHORIZATION).unwrap(), "Bearer T1");
    }

    #[tokio::test]
    async fn health_check_never_sends_credentials() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond(
            200,
            json!({ "success": true, "user": { "id": "1" }, "token": "T1" }),
        );
        transport.respond(200, json!({ "status": "ok", "timestamp": "2024-01-01T00:00:00Z" }));

        let mut session = session(&transport);
        session
            .login(&AuthCredentials {
                email: "a@b.com".into(),
                password: "x".into(),
            })
            .await
            .unwrap();
        let health = session.health_check().await.unwrap();

        assert_eq!(health.status, "ok");
        assert!(transport.last_request().unwrap().headers.get(AUTHORIZATION).is_none());
    }
}
