use crate::game::service::BattleService;
use crate::logger;
use crate::models::deck::is_valid_deck_size;
use crate::models::outcome::BattleOutcome;
use crate::models::player::{Player, PlayerId};
use crate::store::CardStore;
use crate::utils::errors::{BattleError, LobbyError};
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex};
use tokio::task::{JoinError, JoinHandle};
use tokio::time;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    Joined,
    AlreadyWaiting,
    /// The player's previous match is still being fought.
    InBattle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Membership {
    NotWaiting,
    Waiting,
    Matched,
}

#[derive(Debug, Clone)]
pub enum MatchStatus {
    Completed(BattleOutcome),
    Failed(String),
    TimedOut,
    Panicked,
}

/// Published once per dispatched match, whatever the way it ended.
#[derive(Debug, Clone)]
pub struct MatchReport {
    pub players: [PlayerId; 2],
    pub status: MatchStatus,
}

/// Handle on a dispatched match. Dropping it leaves the match running.
pub struct MatchTicket {
    pub players: [PlayerId; 2],
    handle: JoinHandle<MatchReport>,
}

impl MatchTicket {
    pub fn involves(&self, player: PlayerId) -> bool {
        self.players.contains(&player)
    }

    pub async fn wait(self) -> MatchReport {
        match self.handle.await {
            Ok(report) => report,
            Err(_) => MatchReport {
                players: self.players,
                status: MatchStatus::Panicked,
            },
        }
    }
}

#[derive(Default)]
struct LobbyState {
    waiting: VecDeque<Player>,
    matched: HashSet<PlayerId>,
}

/// The matchmaking pool. One instance is built by the composition root and
/// shared; every queue access goes through `state`, which is never held while
/// a match runs.
pub struct Lobby {
    state: Arc<Mutex<LobbyState>>,
    cards: Arc<dyn CardStore>,
    battles: Arc<BattleService>,
    timeout: Duration,
    reports: broadcast::Sender<MatchReport>,
}

impl Lobby {
    pub fn new(cards: Arc<dyn CardStore>, battles: Arc<BattleService>, timeout: Duration) -> Self {
        let (reports, _) = broadcast::channel(32);
        Self {
            state: Arc::new(Mutex::new(LobbyState::default())),
            cards,
            battles,
            timeout,
            reports,
        }
    }

    /// Queues `player` for a match.
    ///
    /// # Arguments
    /// * `player` - Snapshot of the player, as loaded by the caller.
    ///
    /// # Returns
    /// * `Ok(JoinOutcome::Joined)` - the player was appended to the queue.
    /// * `Ok(JoinOutcome::AlreadyWaiting)` / `Ok(JoinOutcome::InBattle)` - nothing changed.
    /// * `Err(LobbyError::InvalidDeck)` - the deck does not hold exactly four cards.
    /// * `Err(LobbyError::Store)` - the deck size could not be read.
    pub async fn try_join(&self, player: Player) -> Result<JoinOutcome, LobbyError> {
        logger!(INFO, "[LOBBY] `{}` ({}) is trying to join", player.username, player.id);

        let size = self.cards.get_deck_size(player.id).await?;
        if !is_valid_deck_size(size) {
            logger!(
                WARN,
                "[LOBBY] `{}` does not have a valid deck (only {size} cards)",
                player.username
            );
            return Err(LobbyError::InvalidDeck { player: player.id, size });
        }

        let mut state = self.state.lock().await;
        if state.matched.contains(&player.id) {
            logger!(INFO, "[LOBBY] `{}` is still in a battle", player.username);
            return Ok(JoinOutcome::InBattle);
        }
        if state.waiting.iter().any(|waiting| waiting.id == player.id) {
            logger!(INFO, "[LOBBY] `{}` is already in the lobby", player.username);
            return Ok(JoinOutcome::AlreadyWaiting);
        }

        logger!(
            INFO,
            "[LOBBY] `{}` joined, {} waiting",
            player.username,
            state.waiting.len() + 1
        );
        state.waiting.push_back(player);
        Ok(JoinOutcome::Joined)
    }

    /// Boolean form of `try_join` for callers that only care whether the queue grew.
    ///
    /// # Returns
    /// * `Ok(true)` - The player was queued by this call.
    /// * `Ok(false)` - The player was already waiting or is still in a battle.
    /// * `Err(LobbyError)` - As for `try_join`.
    pub async fn try_join_lobby(&self, player: Player) -> Result<bool, LobbyError> {
        Ok(self.try_join(player).await? == JoinOutcome::Joined)
    }

    /// Pairs the two longest-waiting players and dispatches their match, if
    /// at least two are waiting. The lobby lock is released before dispatch.
    ///
    /// # Returns
    /// * `Some(MatchTicket)` - The pair that was dispatched; their match is already running.
    /// * `None` - Fewer than two players are waiting.
    pub async fn try_start_match(&self) -> Option<MatchTicket> {
        let (first, second) = {
            let mut state = self.state.lock().await;
            if state.waiting.len() < 2 {
                logger!(DEBUG, "[LOBBY] {} waiting, no match yet", state.waiting.len());
                return None;
            }
            let first = state.waiting.pop_front()?;
            let second = state.waiting.pop_front()?;
            state.matched.insert(first.id);
            state.matched.insert(second.id);
            (first, second)
        };

        logger!(INFO, "[LOBBY] Matched `{}` with `{}`", first.username, second.username);
        Some(self.dispatch(first, second))
    }

    /// Fire-and-forget form of `try_start_match`; completion is published on `subscribe`.
    pub async fn check_for_battle(&self) {
        let _ = self.try_start_match().await;
    }

    /// Receives a `MatchReport` for every match dispatched after the call.
    pub fn subscribe(&self) -> broadcast::Receiver<MatchReport> {
        self.reports.subscribe()
    }

    /// Where `player` currently stands in the lobby.
    ///
    /// # Returns
    /// * `Membership::Waiting` - Queued, not yet paired.
    /// * `Membership::Matched` - Paired and the match has not reported yet.
    /// * `Membership::NotWaiting` - Anything else.
    pub async fn membership(&self, player: PlayerId) -> Membership {
        let state = self.state.lock().await;
        if state.matched.contains(&player) {
            Membership::Matched
        } else if state.waiting.iter().any(|waiting| waiting.id == player) {
            Membership::Waiting
        } else {
            Membership::NotWaiting
        }
    }

    pub async fn waiting_count(&self) -> usize {
        self.state.lock().await.waiting.len()
    }

    /// Runs the match on its own task under a supervisor that absorbs panics,
    /// releases both players and publishes the report.
    ///
    /// Only the read and compute phase is bounded by the timeout. Once an
    /// outcome exists its writes are run to completion, so a slow store can
    /// delay a report but never leave a match half applied.
    fn dispatch(&self, first: Player, second: Player) -> MatchTicket {
        let players = [first.id, second.id];
        let state = Arc::clone(&self.state);
        let battles = Arc::clone(&self.battles);
        let reports = self.reports.clone();
        let timeout = self.timeout;

        let handle = tokio::spawn(async move {
            let mut fight = {
                let battles = Arc::clone(&battles);
                tokio::spawn(async move { battles.fight(&first, &second).await })
            };

            let fought = time::timeout(timeout, &mut fight).await;
            let status = match fought {
                Ok(Ok(Ok(outcome))) => {
                    let settle = tokio::spawn(async move { battles.settle(outcome).await });
                    match_status(players, settle.await)
                }
                Ok(finished) => match_status(players, finished),
                Err(_) => {
                    fight.abort();
                    logger!(
                        WARN,
                        "[LOBBY] Match {} vs {} timed out after {:?}",
                        players[0],
                        players[1],
                        timeout
                    );
                    MatchStatus::TimedOut
                }
            };

            {
                let mut guard = state.lock().await;
                guard.matched.remove(&players[0]);
                guard.matched.remove(&players[1]);
            }

            let report = MatchReport { players, status };
            // No subscribers is fine.
            let _ = reports.send(report.clone());
            report
        });

        MatchTicket { players, handle }
    }
}

fn match_status(
    players: [PlayerId; 2],
    joined: Result<Result<BattleOutcome, BattleError>, JoinError>,
) -> MatchStatus {
    match joined {
        Ok(Ok(outcome)) => MatchStatus::Completed(outcome),
        Ok(Err(error)) => {
            if error.is_fatal() {
                logger!(ERROR, "[LOBBY] Match {} vs {} aborted ({error})", players[0], players[1]);
            } else {
                logger!(WARN, "[LOBBY] Match {} vs {} failed ({error})", players[0], players[1]);
            }
            MatchStatus::Failed(error.to_string())
        }
        Err(join_error) => {
            logger!(ERROR, "[LOBBY] Match {} vs {} crashed ({join_error})", players[0], players[1]);
            if join_error.is_panic() {
                MatchStatus::Panicked
            } else {
                MatchStatus::Failed(join_error.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::rules::RuleOrder;
    use crate::models::card::{Card, CardId, Element};
    use crate::models::player::StatsDelta;
    use crate::store::battle_log::MemoryBattleLog;
    use crate::store::memory::MemoryStore;
    use crate::store::UserStore;
    use crate::utils::errors::StoreError;
    use async_trait::async_trait;

    #[derive(Clone, Copy, PartialEq)]
    enum DeckMode {
        Normal,
        Fail,
        Hang,
        Panic,
    }

    /// Memory store whose `get_deck` can be told to misbehave.
    struct ScriptedStore {
        inner: Arc<MemoryStore>,
        mode: DeckMode,
    }

    #[async_trait]
    impl CardStore for ScriptedStore {
        async fn get_deck(&self, player: PlayerId) -> Result<Vec<Card>, StoreError> {
            match self.mode {
                DeckMode::Normal => self.inner.get_deck(player).await,
                DeckMode::Fail => Err(StoreError::Unavailable("deck service down".to_string())),
                DeckMode::Hang => {
                    time::sleep(Duration::from_secs(30)).await;
                    self.inner.get_deck(player).await
                }
                DeckMode::Panic => panic!("deck service exploded"),
            }
        }

        async fn get_deck_size(&self, player: PlayerId) -> Result<usize, StoreError> {
            self.inner.get_deck_size(player).await
        }

        async fn transfer_card_ownership(&self, card: CardId, owner: PlayerId) -> Result<(), StoreError> {
            self.inner.transfer_card_ownership(card, owner).await
        }

        async fn remove_card_from_deck(&self, player: PlayerId, card: CardId) -> Result<(), StoreError> {
            self.inner.remove_card_from_deck(player, card).await
        }

        async fn refill_deck(&self, player: PlayerId) -> Result<(), StoreError> {
            self.inner.refill_deck(player).await
        }
    }

    /// User store whose stat writes take longer than the lobby timeout.
    struct SlowStats {
        inner: Arc<MemoryStore>,
        delay: Duration,
    }

    #[async_trait]
    impl UserStore for SlowStats {
        async fn get_player(&self, player: PlayerId) -> Result<Player, StoreError> {
            self.inner.get_player(player).await
        }

        async fn get_rating(&self, player: PlayerId) -> Result<u32, StoreError> {
            self.inner.get_rating(player).await
        }

        async fn update_stats(&self, player: PlayerId, delta: &StatsDelta) -> Result<(), StoreError> {
            time::sleep(self.delay).await;
            self.inner.update_stats(player, delta).await
        }
    }

    struct Fixture {
        store: Arc<MemoryStore>,
        lobby: Lobby,
    }

    fn fixture(mode: DeckMode, timeout: Duration) -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let cards: Arc<dyn CardStore> = Arc::new(ScriptedStore { inner: store.clone(), mode });
        let battles = Arc::new(BattleService::new(
            cards.clone(),
            store.clone(),
            Arc::new(MemoryBattleLog::new()),
            RuleOrder::default(),
        ));
        Fixture {
            lobby: Lobby::new(cards, battles, timeout),
            store,
        }
    }

    async fn player(store: &MemoryStore, name: &str, deck_size: usize) -> Player {
        let player = Player::new(name);
        store.add_player(player.clone()).await;
        let deck = (0..deck_size)
            .map(|i| Card::spell("RegularSpell", 10.0 + i as f64, Element::Normal))
            .collect();
        store.set_deck(player.id, deck).await;
        player
    }

    #[tokio::test]
    async fn test_join_twice_is_idempotent() {
        let f = fixture(DeckMode::Normal, Duration::from_secs(5));
        let p1 = player(&f.store, "altenhof", 4).await;

        assert_eq!(f.lobby.try_join(p1.clone()).await.unwrap(), JoinOutcome::Joined);
        assert_eq!(f.lobby.try_join(p1.clone()).await.unwrap(), JoinOutcome::AlreadyWaiting);
        assert_eq!(f.lobby.waiting_count().await, 1);
        assert!(!f.lobby.try_join_lobby(p1.clone()).await.unwrap());
        assert_eq!(f.lobby.membership(p1.id).await, Membership::Waiting);
    }

    #[tokio::test]
    async fn test_invalid_deck_is_rejected() {
        let f = fixture(DeckMode::Normal, Duration::from_secs(5));
        let p1 = player(&f.store, "altenhof", 3).await;

        let error = f.lobby.try_join(p1.clone()).await.unwrap_err();
        assert!(matches!(error, LobbyError::InvalidDeck { size: 3, .. }));
        assert_eq!(f.lobby.waiting_count().await, 0);
        assert_eq!(f.lobby.membership(p1.id).await, Membership::NotWaiting);
    }

    #[tokio::test]
    async fn test_unknown_player_surfaces_store_error() {
        let f = fixture(DeckMode::Normal, Duration::from_secs(5));
        let error = f.lobby.try_join(Player::new("ghost")).await.unwrap_err();

        assert!(matches!(error, LobbyError::Store(StoreError::PlayerNotFound(_))));
    }

    #[tokio::test]
    async fn test_single_player_does_not_start_a_match() {
        let f = fixture(DeckMode::Normal, Duration::from_secs(5));
        let p1 = player(&f.store, "altenhof", 4).await;
        f.lobby.try_join(p1).await.unwrap();

        assert!(f.lobby.try_start_match().await.is_none());
        assert_eq!(f.lobby.waiting_count().await, 1);
    }

    #[tokio::test]
    async fn test_first_two_joiners_are_paired() {
        let f = fixture(DeckMode::Normal, Duration::from_secs(5));
        let p1 = player(&f.store, "altenhof", 4).await;
        let p2 = player(&f.store, "kienboec", 4).await;
        let p3 = player(&f.store, "admin", 4).await;
        for p in [&p1, &p2, &p3] {
            f.lobby.try_join(p.clone()).await.unwrap();
        }

        let ticket = f.lobby.try_start_match().await.expect("two players are waiting");
        assert_eq!(ticket.players, [p1.id, p2.id]);
        assert_eq!(f.lobby.membership(p1.id).await, Membership::Matched);
        assert_eq!(f.lobby.membership(p3.id).await, Membership::Waiting);
        assert_eq!(f.lobby.try_join(p2.clone()).await.unwrap(), JoinOutcome::InBattle);

        let report = ticket.wait().await;
        assert!(matches!(report.status, MatchStatus::Completed(_)));
        assert_eq!(f.lobby.membership(p1.id).await, Membership::NotWaiting);
        assert_eq!(f.lobby.membership(p2.id).await, Membership::NotWaiting);
        assert_eq!(f.lobby.waiting_count().await, 1);

        assert_eq!(f.store.get_player(p1.id).await.unwrap().stats.games_played, 1);
        assert_eq!(f.store.get_player(p2.id).await.unwrap().stats.games_played, 1);
    }

    #[tokio::test]
    async fn test_reports_are_published() {
        let f = fixture(DeckMode::Normal, Duration::from_secs(5));
        let mut reports = f.lobby.subscribe();
        let p1 = player(&f.store, "altenhof", 4).await;
        let p2 = player(&f.store, "kienboec", 4).await;
        f.lobby.try_join(p1.clone()).await.unwrap();
        f.lobby.try_join(p2.clone()).await.unwrap();

        f.lobby.check_for_battle().await;

        let report = reports.recv().await.unwrap();
        assert_eq!(report.players, [p1.id, p2.id]);
        assert!(matches!(report.status, MatchStatus::Completed(_)));
    }

    #[tokio::test]
    async fn test_failed_match_releases_players() {
        let f = fixture(DeckMode::Fail, Duration::from_secs(5));
        let p1 = player(&f.store, "altenhof", 4).await;
        let p2 = player(&f.store, "kienboec", 4).await;
        f.lobby.try_join(p1.clone()).await.unwrap();
        f.lobby.try_join(p2.clone()).await.unwrap();

        let report = f.lobby.try_start_match().await.unwrap().wait().await;
        assert!(matches!(report.status, MatchStatus::Failed(ref reason) if reason.contains("deck service down")));
        assert_eq!(f.lobby.try_join(p1).await.unwrap(), JoinOutcome::Joined);
    }

    #[tokio::test]
    async fn test_panicking_match_is_isolated() {
        let f = fixture(DeckMode::Panic, Duration::from_secs(5));
        let p1 = player(&f.store, "altenhof", 4).await;
        let p2 = player(&f.store, "kienboec", 4).await;
        let p3 = player(&f.store, "admin", 4).await;
        f.lobby.try_join(p1.clone()).await.unwrap();
        f.lobby.try_join(p2.clone()).await.unwrap();

        let report = f.lobby.try_start_match().await.unwrap().wait().await;
        assert!(matches!(report.status, MatchStatus::Panicked));
        assert_eq!(f.lobby.membership(p1.id).await, Membership::NotWaiting);
        assert_eq!(f.lobby.try_join(p3).await.unwrap(), JoinOutcome::Joined);
    }

    #[tokio::test]
    async fn test_hanging_match_times_out() {
        let f = fixture(DeckMode::Hang, Duration::from_millis(50));
        let p1 = player(&f.store, "altenhof", 4).await;
        let p2 = player(&f.store, "kienboec", 4).await;
        f.lobby.try_join(p1.clone()).await.unwrap();
        f.lobby.try_join(p2.clone()).await.unwrap();

        let report = f.lobby.try_start_match().await.unwrap().wait().await;
        assert!(matches!(report.status, MatchStatus::TimedOut));
        assert_eq!(f.lobby.membership(p2.id).await, Membership::NotWaiting);
    }

    #[tokio::test]
    async fn test_slow_settlement_is_not_cut_short() {
        let store = Arc::new(MemoryStore::new());
        let users = Arc::new(SlowStats { inner: store.clone(), delay: Duration::from_millis(300) });
        let battles = Arc::new(BattleService::new(
            store.clone(),
            users,
            Arc::new(MemoryBattleLog::new()),
            RuleOrder::default(),
        ));
        let lobby = Lobby::new(store.clone(), battles, Duration::from_millis(100));

        let strong = Player::new("altenhof");
        let weak = Player::new("kienboec");
        for (player, damage) in [(&strong, 50.0), (&weak, 10.0)] {
            store.add_player(player.clone()).await;
            let deck = (0..4).map(|_| Card::spell("RegularSpell", damage, Element::Normal)).collect();
            store.set_deck(player.id, deck).await;
        }
        lobby.try_join(strong.clone()).await.unwrap();
        lobby.try_join(weak.clone()).await.unwrap();

        let report = lobby.try_start_match().await.unwrap().wait().await;
        assert!(matches!(report.status, MatchStatus::Completed(_)));

        assert_eq!(store.owned_cards(strong.id).await.len(), 8);
        assert_eq!(store.owned_cards(weak.id).await.len(), 0);
        let winner = store.get_player(strong.id).await.unwrap().stats;
        let loser = store.get_player(weak.id).await.unwrap().stats;
        assert_eq!((winner.elo, winner.games_played), (103, 1));
        assert_eq!((loser.elo, loser.games_played), (95, 1));
        assert_eq!(lobby.membership(weak.id).await, Membership::NotWaiting);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_joins_queue_a_player_once() {
        let f = fixture(DeckMode::Normal, Duration::from_secs(5));
        let p1 = player(&f.store, "altenhof", 4).await;
        let lobby = Arc::new(f.lobby);

        let mut handles = Vec::new();
        for _ in 0..16 {
            let lobby = Arc::clone(&lobby);
            let p1 = p1.clone();
            handles.push(tokio::spawn(async move { lobby.try_join(p1).await.unwrap() }));
        }

        let mut joined = 0;
        for handle in handles {
            if handle.await.unwrap() == JoinOutcome::Joined {
                joined += 1;
            }
        }
        assert_eq!(joined, 1);
        assert_eq!(lobby.waiting_count().await, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_matchmaking_pairs_everyone_once() {
        let f = fixture(DeckMode::Normal, Duration::from_secs(5));
        let mut players = Vec::new();
        for i in 0..12 {
            players.push(player(&f.store, &format!("player{i}"), 4).await);
        }
        let lobby = Arc::new(f.lobby);

        let mut joins = Vec::new();
        for p in players.clone() {
            let lobby = Arc::clone(&lobby);
            joins.push(tokio::spawn(async move {
                lobby.try_join(p).await.unwrap();
                lobby.try_start_match().await
            }));
        }

        let mut tickets = Vec::new();
        for join in joins {
            if let Some(ticket) = join.await.unwrap() {
                tickets.push(ticket);
            }
        }
        while let Some(ticket) = lobby.try_start_match().await {
            tickets.push(ticket);
        }

        let mut seen = HashSet::new();
        for ticket in &tickets {
            assert_ne!(ticket.players[0], ticket.players[1]);
            for id in ticket.players {
                assert!(seen.insert(id), "player matched twice");
            }
        }
        assert_eq!(seen.len(), players.len());

        for ticket in tickets {
            assert!(matches!(ticket.wait().await.status, MatchStatus::Completed(_)));
        }
    }
}
