use crate::logger;
use crate::models::card::{Card, CardId, CardRecord};
use crate::models::player::{Player, PlayerId, StatsDelta};
use crate::models::settings::Settings;
use crate::store::{CardStore, UserStore};
use crate::utils::errors::StoreError;
use async_trait::async_trait;
use reqwest::{Response, StatusCode};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
struct DeckSizeResponse {
    size: usize,
}

#[derive(Debug, Serialize)]
struct TransferRequest {
    #[serde(rename = "ownerId")]
    owner_id: PlayerId,
}

/// Card and user store backed by the deck and user services over HTTP.
pub struct RemoteStore {
    client: reqwest::Client,
    deck_server: String,
    user_server: String,
}

impl RemoteStore {
    /// Builds a store talking to `DECK_SERVER` and `USER_SERVER`.
    ///
    /// # Arguments
    /// * `settings` - Loaded settings; trailing slashes on the server URLs are dropped.
    pub fn new(settings: &Settings) -> Self {
        Self {
            client: reqwest::Client::new(),
            deck_server: settings.deck_server.trim_end_matches('/').to_string(),
            user_server: settings.user_server.trim_end_matches('/').to_string(),
        }
    }

    fn deck_url(&self, path: &str) -> String {
        format!("{}/api/{}", self.deck_server, path)
    }

    fn user_url(&self, path: &str) -> String {
        format!("{}/api/{}", self.user_server, path)
    }
}

/// Maps a service response onto `Ok` for 2xx and a `StoreError` otherwise.
///
/// `not_found` is returned for 404 so callers can say which entity was missing.
async fn check(response: Response, not_found: StoreError) -> Result<Response, StoreError> {
    match response.status() {
        status if status.is_success() => Ok(response),
        StatusCode::NOT_FOUND => Err(not_found),
        StatusCode::SERVICE_UNAVAILABLE | StatusCode::BAD_GATEWAY | StatusCode::GATEWAY_TIMEOUT => {
            Err(StoreError::Unavailable(response.status().to_string()))
        }
        status => {
            let body = response.text().await.unwrap_or("NO MESSAGE".to_string());
            Err(StoreError::UnexpectedResponse(format!("{status}: {body}")))
        }
    }
}

#[async_trait]
impl CardStore for RemoteStore {
    async fn get_deck(&self, player: PlayerId) -> Result<Vec<Card>, StoreError> {
        let response = self.client.get(self.deck_url(&format!("deck/{player}"))).send().await?;
        let records = check(response, StoreError::PlayerNotFound(player))
            .await?
            .json::<Vec<CardRecord>>()
            .await
            .map_err(|_| StoreError::InvalidResponseBody("Vec<CardRecord>".to_string()))?;

        logger!(DEBUG, "[STORE] Fetched {} cards from `{player}`'s deck", records.len());
        Ok(records.into_iter().map(CardRecord::into_card).collect())
    }

    async fn get_deck_size(&self, player: PlayerId) -> Result<usize, StoreError> {
        let response = self.client.get(self.deck_url(&format!("deck/{player}/size"))).send().await?;
        let body = check(response, StoreError::PlayerNotFound(player))
            .await?
            .json::<DeckSizeResponse>()
            .await
            .map_err(|_| StoreError::InvalidResponseBody("DeckSizeResponse".to_string()))?;
        Ok(body.size)
    }

    async fn transfer_card_ownership(&self, card: CardId, new_owner: PlayerId) -> Result<(), StoreError> {
        let response = self
            .client
            .put(self.deck_url(&format!("card/{card}/owner")))
            .json(&TransferRequest { owner_id: new_owner })
            .send()
            .await?;
        check(response, StoreError::CardNotFound(card)).await?;
        Ok(())
    }

    async fn remove_card_from_deck(&self, player: PlayerId, card: CardId) -> Result<(), StoreError> {
        let response = self
            .client
            .delete(self.deck_url(&format!("deck/{player}/card/{card}")))
            .send()
            .await?;
        check(response, StoreError::CardNotFound(card)).await?;
        Ok(())
    }

    async fn refill_deck(&self, player: PlayerId) -> Result<(), StoreError> {
        let response = self.client.post(self.deck_url(&format!("deck/{player}/refill"))).send().await?;
        check(response, StoreError::PlayerNotFound(player)).await?;
        Ok(())
    }
}

#[async_trait]
impl UserStore for RemoteStore {
    async fn get_player(&self, player: PlayerId) -> Result<Player, StoreError> {
        let response = self.client.get(self.user_url(&format!("player/{player}"))).send().await?;
        check(response, StoreError::PlayerNotFound(player))
            .await?
            .json::<Player>()
            .await
            .map_err(|_| StoreError::InvalidResponseBody("Player".to_string()))
    }

    async fn get_rating(&self, player: PlayerId) -> Result<u32, StoreError> {
        Ok(self.get_player(player).await?.stats.elo)
    }

    async fn update_stats(&self, player: PlayerId, delta: &StatsDelta) -> Result<(), StoreError> {
        let response = self
            .client
            .patch(self.user_url(&format!("player/{player}/stats")))
            .json(delta)
            .send()
            .await?;
        check(response, StoreError::PlayerNotFound(player)).await?;
        Ok(())
    }
}
