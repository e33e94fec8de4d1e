use mtcg_battle::controller::BattleController;
use mtcg_battle::game::lobby::Lobby;
use mtcg_battle::game::service::BattleService;
use mtcg_battle::logger;
use mtcg_battle::models::settings::Settings;
use mtcg_battle::store::battle_log::FileBattleLog;
use mtcg_battle::store::remote::RemoteStore;
use mtcg_battle::utils::logger::Logger;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinSet;
use uuid::Uuid;

#[tokio::main]
async fn main() {
    let settings = match Settings::load() {
        Ok(settings) => settings,
        Err(error) => {
            logger!(ERROR, "[SERVER] {error}");
            std::process::exit(1);
        }
    };
    if let Ok(level) = settings.level() {
        Logger::set_level(level);
    }

    let store = Arc::new(RemoteStore::new(&settings));
    let battle_log = Arc::new(FileBattleLog::new(settings.battle_log_dir.clone()));
    let battles = Arc::new(BattleService::new(
        store.clone(),
        store.clone(),
        battle_log,
        settings.rule_order,
    ));
    let lobby = Arc::new(Lobby::new(store.clone(), battles, settings.battle_timeout()));
    let controller = Arc::new(BattleController::new(store, lobby));

    logger!(INFO, "[SERVER] Lobby open, reading player ids from stdin");

    let mut requests = JoinSet::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        let line = line.trim().to_string();
        if line.is_empty() {
            continue;
        }
        let Ok(player_id) = line.parse::<Uuid>() else {
            logger!(WARN, "[SERVER] `{line}` is not a player id");
            continue;
        };

        let controller = Arc::clone(&controller);
        requests.spawn(async move {
            let reply = controller.handle_battle_request(player_id).await;
            println!("{player_id}: {} {}", reply.status, reply.message);
            if let Some(body) = reply.body {
                println!("{body}");
            }
        });
    }

    while requests.join_next().await.is_some() {}
}
