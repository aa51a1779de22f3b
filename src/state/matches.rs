use crate::state::collection::{
    insert_front_unique, merge_local_first, new_local_id, remove_by_id, replace_by_id,
};
use crate::state::events::{EventSink, MatchSnapshot, StoreEvent};
use crate::state::filters::{MatchFilters, filter_matches};
use crate::state::local_store::LocalEntities;
use crate::state::remote::MatchSource;
use chrono::Utc;
use log::{debug, info, warn};
use pitchside_api::{
    Match, MatchDetail, MatchDraft, MatchDraftKind, MatchKind, MatchPlayer, MatchQuery,
    MatchStatus, PlayerSlots, TeamEntry, is_local_id,
};
use std::sync::Arc;

/// What join/leave report when the server call fails outright.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SlotPolicy {
    /// Adjust the held counts anyway and report success. Counts are never
    /// reconciled with the server afterwards.
    #[default]
    Optimistic,
    /// Leave counts untouched and report failure.
    ServerConfirmed,
}

impl SlotPolicy {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "optimistic" => Some(SlotPolicy::Optimistic),
            "server" | "server-confirmed" | "confirmed" => Some(SlotPolicy::ServerConfirmed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum SlotChange {
    Join,
    Leave,
}

/// Matchmaking list: server matches merged with matches that only exist on
/// this device (team matches, and player matches whose create never reached
/// the server).
pub struct MatchStore {
    source: Arc<dyn MatchSource>,
    persisted: LocalEntities<Match>,
    events: EventSink,
    policy: SlotPolicy,
    fallback: Vec<Match>,
    local: Vec<Match>,
    matches: Vec<Match>,
    visible: Vec<Match>,
    filters: MatchFilters,
    error: Option<String>,
}

impl MatchStore {
    pub fn new(
        source: Arc<dyn MatchSource>,
        persisted: LocalEntities<Match>,
        events: EventSink,
        policy: SlotPolicy,
    ) -> Self {
        Self {
            source,
            persisted,
            events,
            policy,
            fallback: Vec::new(),
            local: Vec::new(),
            matches: Vec::new(),
            visible: Vec::new(),
            filters: MatchFilters::default(),
            error: None,
        }
    }

    /// Matches shown alongside local ones while the server is unreachable.
    pub fn with_fallback(mut self, fallback: Vec<Match>) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn matches(&self) -> &[Match] {
        &self.matches
    }

    pub fn visible(&self) -> &[Match] {
        &self.visible
    }

    pub fn local(&self) -> &[Match] {
        &self.local
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn slot_policy(&self) -> SlotPolicy {
        self.policy
    }

    pub fn filters(&self) -> MatchFilters {
        self.filters
    }

    pub fn find(&self, id: &str) -> Option<&Match> {
        self.matches.iter().find(|m| m.id == id)
    }

    pub fn clear_error(&mut self) {
        if self.error.take().is_some() {
            self.reapply();
        }
    }

    /// Load persisted local matches, then refresh.
    pub async fn initialize(&mut self, query: &MatchQuery) -> &[Match] {
        self.local = self.persisted.load().await;
        info!("restored {} local matches", self.local.len());
        self.refresh(query).await
    }

    pub async fn refresh(&mut self, query: &MatchQuery) -> &[Match] {
        if self.local.is_empty() {
            self.local = self.persisted.load().await;
        }
        self.error = None;

        let remote = match self.source.matches(query).await {
            Ok(normalized) => {
                for skipped in &normalized.skipped {
                    warn!("skipped match {:?}: {}", skipped.id, skipped.reason);
                }
                normalized.items
            }
            Err(e) => {
                warn!("match fetch failed: {e}");
                self.error = Some(e.to_string());
                self.fallback.clone()
            }
        };

        self.matches = merge_local_first(&self.local, remote);
        debug!("{} matches after merge ({} local)", self.matches.len(), self.local.len());
        self.reapply();
        &self.visible
    }

    /// Team matches never leave the device. Player matches go to the server
    /// and fall back to a local match when the create fails.
    pub async fn create(&mut self, draft: MatchDraft) -> Match {
        self.error = None;
        if matches!(draft.kind, MatchDraftKind::Team { .. }) {
            return self.create_local(&draft).await;
        }

        match self.source.create_match(&draft).await {
            Ok(created) => {
                if !insert_front_unique(&mut self.matches, created.clone()) {
                    debug!("match {} already present after create", created.id);
                }
                self.reapply();
                created
            }
            Err(e) => {
                warn!("match create failed, keeping it on this device: {e}");
                self.create_local(&draft).await
            }
        }
    }

    pub async fn join(&mut self, id: &str, player_name: Option<&str>) -> bool {
        self.change_slots(id, SlotChange::Join, player_name).await
    }

    pub async fn leave(&mut self, id: &str) -> bool {
        self.change_slots(id, SlotChange::Leave, None).await
    }

    /// One match with its roster. Local matches have no roster; when the
    /// server cannot answer the held copy is returned without one.
    pub async fn details(&mut self, id: &str) -> Option<MatchDetail> {
        self.error = None;
        let held = self.find(id).cloned();
        if is_local_id(id) {
            return held.map(|game| MatchDetail { game, players: Vec::new() });
        }

        match self.source.match_detail(id).await {
            Ok(mut detail) => {
                if detail.players.is_empty() {
                    detail.players = self.players(id).await;
                }
                if replace_by_id(&mut self.matches, detail.game.clone()) {
                    self.reapply();
                }
                Some(detail)
            }
            Err(e) => {
                warn!("match {id} details failed: {e}");
                self.error = Some(e.to_string());
                self.reapply();
                held.map(|game| MatchDetail { game, players: Vec::new() })
            }
        }
    }

    /// Roster of a server match; empty when it cannot be fetched.
    pub async fn players(&self, id: &str) -> Vec<MatchPlayer> {
        if is_local_id(id) {
            return Vec::new();
        }
        match self.source.match_players(id).await {
            Ok(players) => players,
            Err(e) => {
                warn!("roster for {id} failed: {e}");
                Vec::new()
            }
        }
    }

    /// Drop a local match for good. Server matches cannot be discarded.
    pub async fn discard_local(&mut self, id: &str) -> bool {
        if !is_local_id(id) || remove_by_id(&mut self.local, id).is_none() {
            return false;
        }
        if self.local.is_empty() {
            self.persisted.clear().await;
        } else {
            self.persisted.save(&self.local).await;
        }
        remove_by_id(&mut self.matches, id);
        self.reapply();
        true
    }

    pub fn apply_filters(&mut self, filters: MatchFilters) -> &[Match] {
        self.filters = filters;
        self.reapply();
        &self.visible
    }

    pub fn clear_filters(&mut self) -> &[Match] {
        self.apply_filters(MatchFilters::default())
    }

    async fn create_local(&mut self, draft: &MatchDraft) -> Match {
        let created = local_match(draft, new_local_id());
        info!("created local match {}", created.id);

        self.local.insert(0, created.clone());
        self.persisted.save(&self.local).await;
        insert_front_unique(&mut self.matches, created.clone());
        self.reapply();
        created
    }

    async fn change_slots(&mut self, id: &str, change: SlotChange, player_name: Option<&str>) -> bool {
        self.error = None;

        // Local matches have no server counterpart to ask.
        if is_local_id(id) {
            let changed = self.apply_slot_change(id, change);
            if changed {
                self.persist_local_copy(id).await;
            }
            self.reapply();
            return changed;
        }

        let reply = match change {
            SlotChange::Join => self.source.join_match(id, player_name).await,
            SlotChange::Leave => self.source.leave_match(id).await,
        };

        let ok = match reply {
            Ok(Some(updated)) => {
                replace_by_id(&mut self.matches, updated);
                true
            }
            Ok(None) => {
                if let Err(reason) = self.adjust_slots(id, change) {
                    debug!("{change:?} {id} acknowledged, nothing to adjust: {reason}");
                }
                true
            }
            Err(e) => match self.policy {
                SlotPolicy::Optimistic => {
                    warn!("{change:?} {id} failed, applying locally: {e}");
                    self.apply_slot_change(id, change)
                }
                SlotPolicy::ServerConfirmed => {
                    warn!("{change:?} {id} failed: {e}");
                    self.error = Some(e.to_string());
                    false
                }
            },
        };
        self.reapply();
        ok
    }

    /// Records why nothing moved in `error`.
    fn apply_slot_change(&mut self, id: &str, change: SlotChange) -> bool {
        match self.adjust_slots(id, change) {
            Ok(()) => true,
            Err(reason) => {
                debug!("{change:?} {id} left counts unchanged: {reason}");
                self.error = Some(reason);
                false
            }
        }
    }

    /// Counts stay clamped: joining a full match or leaving an empty one is
    /// an error and leaves the match untouched.
    fn adjust_slots(&mut self, id: &str, change: SlotChange) -> Result<(), String> {
        let Some(held) = self.matches.iter_mut().find(|m| m.id == id) else {
            return Err(format!("Unknown match {id}"));
        };
        let status = held.status;
        let Some(slots) = held.slots_mut() else {
            return Err("Team matches have no player slots".to_owned());
        };
        let (moved, refusal) = match change {
            SlotChange::Join => (slots.join(), "Match is already full"),
            SlotChange::Leave => (slots.leave(), "No players to remove"),
        };
        if !moved {
            return Err(refusal.to_owned());
        }
        held.status = status_after(status, slots);
        Ok(())
    }

    async fn persist_local_copy(&mut self, id: &str) {
        let Some(updated) = self.find(id).cloned() else {
            return;
        };
        if replace_by_id(&mut self.local, updated) {
            self.persisted.save(&self.local).await;
        }
    }

    fn reapply(&mut self) {
        self.visible = filter_matches(&self.matches, &self.filters);
        self.events.publish(StoreEvent::Matches(self.snapshot()));
    }

    pub fn snapshot(&self) -> MatchSnapshot {
        MatchSnapshot {
            visible: self.visible.clone(),
            total: self.matches.len(),
            filters: self.filters,
            error: self.error.clone(),
        }
    }
}

fn status_after(status: MatchStatus, slots: &PlayerSlots) -> MatchStatus {
    match status {
        MatchStatus::Open if slots.is_full() => MatchStatus::Full,
        MatchStatus::Full if !slots.is_full() => MatchStatus::Open,
        other => other,
    }
}

/// The on-device form of a draft. Player matches start with the organizer
/// as the only player, sized for the chosen field.
fn local_match(draft: &MatchDraft, id: String) -> Match {
    let kind = match &draft.kind {
        MatchDraftKind::Player { price_per_player, .. } => {
            MatchKind::Player(PlayerSlots::opened_by_organizer(draft.field_size, *price_per_player))
        }
        MatchDraftKind::Team { team_name } => {
            MatchKind::Team(TeamEntry { team_name: team_name.clone() })
        }
    };
    Match {
        id,
        stadium: draft.stadium.clone(),
        date: draft.date,
        time: draft.time,
        field_size: draft.field_size,
        skill_level: draft.skill_level,
        status: MatchStatus::Open,
        organizer_name: draft.organizer_name.clone(),
        kind,
        created_at: Some(Utc::now()),
        is_local: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::local_store::{JsonDirStore, KeyValueStore, LOCAL_MATCHES_KEY, MemoryStore};
    use async_trait::async_trait;
    use chrono::{NaiveDate, NaiveTime};
    use pitchside_api::client::{ApiError, ApiResult};
    use pitchside_api::{FieldSize, MatchType, Normalized, SkillLevel, StadiumRef};
    use std::collections::HashSet;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Match backend double. `None` in any field means that call fails.
    #[derive(Default)]
    struct FakeMatches {
        remote: Mutex<Option<Vec<Match>>>,
        created: Option<Match>,
        slot_reply: Option<Option<Match>>,
        slot_calls: AtomicUsize,
        detail: Option<MatchDetail>,
        roster: Option<Vec<MatchPlayer>>,
    }

    impl FakeMatches {
        fn serving(matches: Vec<Match>) -> Self {
            Self { remote: Mutex::new(Some(matches)), ..Self::default() }
        }
    }

    #[async_trait]
    impl MatchSource for FakeMatches {
        async fn matches(&self, _: &MatchQuery) -> ApiResult<Normalized<Match>> {
            match self.remote.lock().unwrap().clone() {
                Some(items) => Ok(Normalized { items, skipped: Vec::new() }),
                None => Err(ApiError::Other("offline".into())),
            }
        }

        async fn create_match(&self, _: &MatchDraft) -> ApiResult<Match> {
            self.created.clone().ok_or_else(|| ApiError::Other("offline".into()))
        }

        async fn join_match(&self, _: &str, _: Option<&str>) -> ApiResult<Option<Match>> {
            self.slot_calls.fetch_add(1, Ordering::SeqCst);
            self.slot_reply.clone().ok_or_else(|| ApiError::Other("offline".into()))
        }

        async fn leave_match(&self, _: &str) -> ApiResult<Option<Match>> {
            self.slot_calls.fetch_add(1, Ordering::SeqCst);
            self.slot_reply.clone().ok_or_else(|| ApiError::Other("offline".into()))
        }

        async fn match_detail(&self, _: &str) -> ApiResult<MatchDetail> {
            self.detail.clone().ok_or_else(|| ApiError::Other("offline".into()))
        }

        async fn match_players(&self, _: &str) -> ApiResult<Vec<MatchPlayer>> {
            self.roster.clone().ok_or_else(|| ApiError::Other("offline".into()))
        }
    }

    fn player(name: &str) -> MatchPlayer {
        MatchPlayer { id: None, name: name.to_owned(), joined_at: None }
    }

    fn stadium_ref() -> StadiumRef {
        StadiumRef {
            id: "stad_001".into(),
            name: "Stade El Harrach".into(),
            address: Some("El Harrach, Algiers".into()),
            image: None,
        }
    }

    fn player_match(id: &str, current: u32, max: u32) -> Match {
        Match {
            id: id.to_owned(),
            stadium: stadium_ref(),
            date: NaiveDate::from_ymd_opt(2025, 1, 2).unwrap(),
            time: NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
            field_size: FieldSize::SevenASide,
            skill_level: SkillLevel::Intermediate,
            status: MatchStatus::Open,
            organizer_name: Some("Amine".into()),
            kind: MatchKind::Player(PlayerSlots {
                slots_needed: max - current,
                max_players: max,
                current_players: current,
                price_per_player: 500,
            }),
            created_at: None,
            is_local: false,
        }
    }

    fn team_match(id: &str, team: &str) -> Match {
        Match {
            kind: MatchKind::Team(TeamEntry { team_name: team.to_owned() }),
            is_local: is_local_id(id),
            ..player_match(id, 0, 2)
        }
    }

    fn draft(field_size: FieldSize, kind: MatchDraftKind) -> MatchDraft {
        MatchDraft {
            stadium: stadium_ref(),
            date: NaiveDate::from_ymd_opt(2025, 1, 5).unwrap(),
            time: NaiveTime::from_hms_opt(20, 0, 0).unwrap(),
            field_size,
            skill_level: SkillLevel::Beginner,
            organizer_name: Some("Sofiane".into()),
            kind,
        }
    }

    fn team_draft(name: &str) -> MatchDraft {
        draft(FieldSize::FiveASide, MatchDraftKind::Team { team_name: name.to_owned() })
    }

    fn player_draft(field_size: FieldSize) -> MatchDraft {
        draft(field_size, MatchDraftKind::Player { slots_needed: 3, price_per_player: 400 })
    }

    fn store_with(source: impl Into<Arc<FakeMatches>>, kv: Arc<MemoryStore>, policy: SlotPolicy) -> MatchStore {
        let source: Arc<FakeMatches> = source.into();
        MatchStore::new(
            source,
            LocalEntities::new(kv, LOCAL_MATCHES_KEY),
            EventSink::new(),
            policy,
        )
    }

    fn store(source: FakeMatches) -> MatchStore {
        store_with(source, Arc::new(MemoryStore::new()), SlotPolicy::Optimistic)
    }

    fn ids(matches: &[Match]) -> Vec<&str> {
        matches.iter().map(|m| m.id.as_str()).collect()
    }

    fn slots(store: &MatchStore, id: &str) -> PlayerSlots {
        *store.find(id).and_then(Match::slots).unwrap()
    }

    #[tokio::test]
    async fn local_team_match_survives_server_echo() {
        let source = Arc::new(FakeMatches::serving(vec![player_match("srv1", 10, 14)]));
        let mut store = store_with(source.clone(), Arc::new(MemoryStore::new()), SlotPolicy::Optimistic);
        store.initialize(&MatchQuery::default()).await;

        let created = store.create(team_draft("FC Test")).await;
        assert!(created.id.starts_with("local_"));
        assert!(created.is_local);
        assert_eq!(store.matches()[0].id, created.id);
        assert_eq!(created.match_type(), MatchType::Team);

        // The server catches up and echoes the same id with different data.
        let echo = team_match(&created.id, "Echoed Name");
        *source.remote.lock().unwrap() = Some(vec![echo, player_match("srv1", 10, 14)]);
        store.refresh(&MatchQuery::default()).await;

        let same_id: Vec<&Match> = store.matches().iter().filter(|m| m.id == created.id).collect();
        assert_eq!(same_id.len(), 1);
        assert_eq!(
            same_id[0].kind,
            MatchKind::Team(TeamEntry { team_name: "FC Test".into() })
        );
        assert_eq!(ids(store.matches()), [created.id.as_str(), "srv1"]);
    }

    #[tokio::test]
    async fn refresh_is_idempotent_and_never_duplicates() {
        let kv = Arc::new(MemoryStore::new());
        let stored = vec![team_match("local_a", "Les Aigles"), player_match("local_b", 1, 10)];
        kv.write(LOCAL_MATCHES_KEY, &serde_json::to_string(&stored).unwrap())
            .await
            .unwrap();

        let source = FakeMatches::serving(vec![
            player_match("srv1", 4, 10),
            player_match("local_b", 9, 10),
            player_match("srv2", 2, 14),
        ]);
        let mut store = store_with(source, kv, SlotPolicy::Optimistic);

        let first = ids(store.refresh(&MatchQuery::default()).await)
            .into_iter()
            .map(str::to_owned)
            .collect::<Vec<_>>();
        let second = ids(store.refresh(&MatchQuery::default()).await)
            .into_iter()
            .map(str::to_owned)
            .collect::<Vec<_>>();

        assert_eq!(first, ["local_a", "local_b", "srv1", "srv2"]);
        assert_eq!(first, second);
        let unique: HashSet<&str> = store.matches().iter().map(|m| m.id.as_str()).collect();
        assert_eq!(unique.len(), store.matches().len());
        assert_eq!(slots(&store, "local_b").current_players, 1);
    }

    #[tokio::test]
    async fn failed_create_falls_back_to_local_player_match() {
        for (size, max) in [
            (FieldSize::FiveASide, 10),
            (FieldSize::SevenASide, 14),
            (FieldSize::ElevenASide, 22),
        ] {
            let kv = Arc::new(MemoryStore::new());
            let mut store = store_with(FakeMatches::default(), kv.clone(), SlotPolicy::Optimistic);

            let created = store.create(player_draft(size)).await;
            assert!(created.id.starts_with("local_"));
            let slots = created.slots().copied().unwrap();
            assert_eq!(slots.current_players, 1);
            assert_eq!(slots.max_players, max);
            assert_eq!(slots.slots_needed, max - 1);
            assert_eq!(slots.price_per_player, 400);

            assert_eq!(store.matches()[0].id, created.id);
            let persisted: Vec<Match> =
                serde_json::from_str(&kv.read(LOCAL_MATCHES_KEY).await.unwrap().unwrap()).unwrap();
            assert_eq!(persisted, vec![created]);
        }
    }

    #[tokio::test]
    async fn server_create_goes_to_the_front_once() {
        let server_copy = player_match("srv9", 1, 10);
        let source = FakeMatches {
            remote: Mutex::new(Some(vec![player_match("srv1", 3, 10)])),
            created: Some(server_copy.clone()),
            ..FakeMatches::default()
        };
        let mut store = store(source);
        store.refresh(&MatchQuery::default()).await;

        assert_eq!(store.create(player_draft(FieldSize::FiveASide)).await, server_copy);
        assert_eq!(ids(store.matches()), ["srv9", "srv1"]);
        assert!(store.local().is_empty());

        // A create that races a refresh which already brought the match in.
        store.create(player_draft(FieldSize::FiveASide)).await;
        assert_eq!(ids(store.matches()), ["srv9", "srv1"]);
    }

    #[tokio::test]
    async fn create_survives_storage_failure() {
        let mut store = store_with(
            FakeMatches::default(),
            Arc::new(MemoryStore::read_only()),
            SlotPolicy::Optimistic,
        );
        let created = store.create(team_draft("FC Test")).await;
        assert_eq!(store.matches().len(), 1);
        assert_eq!(store.local()[0].id, created.id);
    }

    #[tokio::test]
    async fn join_leave_cycles_keep_slot_invariant() {
        let source = FakeMatches::serving(vec![player_match("m1", 10, 14)]);
        let mut store = store(source);
        store.refresh(&MatchQuery::default()).await;
        let original = slots(&store, "m1");

        for _ in 0..5 {
            assert!(store.join("m1", Some("Sofiane")).await);
            let s = slots(&store, "m1");
            assert_eq!(s.current_players + s.slots_needed, s.max_players);
            assert!(s.current_players <= s.max_players);
            assert!(store.leave("m1").await);
        }
        assert_eq!(slots(&store, "m1"), original);
    }

    #[tokio::test]
    async fn counts_are_clamped_at_the_edges() {
        let source = FakeMatches::serving(vec![player_match("full", 10, 10), player_match("empty", 0, 10)]);
        let mut store = store(source);
        store.refresh(&MatchQuery::default()).await;

        assert!(!store.join("full", None).await);
        assert_eq!(store.error(), Some("Match is already full"));
        assert_eq!(slots(&store, "full").current_players, 10);
        assert_eq!(slots(&store, "full").slots_needed, 0);

        assert!(!store.leave("empty").await);
        assert_eq!(store.error(), Some("No players to remove"));
        assert_eq!(slots(&store, "empty").current_players, 0);
        assert_eq!(slots(&store, "empty").slots_needed, 10);

        assert!(!store.join("missing", None).await);
        assert_eq!(store.error(), Some("Unknown match missing"));
    }

    #[tokio::test]
    async fn team_matches_refuse_slot_changes() {
        let mut store = store(FakeMatches::default());
        let team = store.create(team_draft("FC Test")).await;

        assert!(!store.join(&team.id, None).await);
        assert_eq!(store.error(), Some("Team matches have no player slots"));
        store.clear_error();
        assert_eq!(store.error(), None);
    }

    #[tokio::test]
    async fn ack_without_body_on_full_match_still_succeeds() {
        let source = FakeMatches {
            remote: Mutex::new(Some(vec![player_match("full", 10, 10)])),
            slot_reply: Some(None),
            ..FakeMatches::default()
        };
        let mut store = store(source);
        store.refresh(&MatchQuery::default()).await;

        assert!(store.join("full", None).await);
        assert_eq!(slots(&store, "full").current_players, 10);
        assert_eq!(store.error(), None);
    }

    #[tokio::test]
    async fn joining_the_last_slot_marks_match_full() {
        let source = FakeMatches::serving(vec![player_match("m1", 9, 10)]);
        let mut store = store(source);
        store.refresh(&MatchQuery::default()).await;

        store.join("m1", None).await;
        assert_eq!(store.find("m1").unwrap().status, MatchStatus::Full);
        store.leave("m1").await;
        assert_eq!(store.find("m1").unwrap().status, MatchStatus::Open);
    }

    #[tokio::test]
    async fn server_confirmed_policy_reports_failure() {
        let source = FakeMatches::serving(vec![player_match("m1", 10, 14)]);
        let mut store = store_with(source, Arc::new(MemoryStore::new()), SlotPolicy::ServerConfirmed);
        store.refresh(&MatchQuery::default()).await;

        assert!(!store.join("m1", None).await);
        assert_eq!(slots(&store, "m1").current_players, 10);
        assert!(store.error().is_some());
    }

    #[tokio::test]
    async fn server_replies_drive_slot_updates() {
        let updated = player_match("m1", 13, 14);
        let source = FakeMatches {
            remote: Mutex::new(Some(vec![player_match("m1", 10, 14)])),
            slot_reply: Some(Some(updated.clone())),
            ..FakeMatches::default()
        };
        let mut store = store(source);
        store.refresh(&MatchQuery::default()).await;
        assert!(store.join("m1", None).await);
        assert_eq!(store.find("m1"), Some(&updated));

        let ack_only = FakeMatches {
            remote: Mutex::new(Some(vec![player_match("m2", 10, 14)])),
            slot_reply: Some(None),
            ..FakeMatches::default()
        };
        let mut store = self::store(ack_only);
        store.refresh(&MatchQuery::default()).await;
        assert!(store.join("m2", None).await);
        assert_eq!(slots(&store, "m2").current_players, 11);
    }

    #[tokio::test]
    async fn local_matches_join_without_the_server() {
        let kv = Arc::new(MemoryStore::new());
        let source = Arc::new(FakeMatches::default());
        let mut store = store_with(source.clone(), kv.clone(), SlotPolicy::ServerConfirmed);
        let created = store.create(player_draft(FieldSize::FiveASide)).await;

        assert!(store.join(&created.id, None).await);
        assert_eq!(source.slot_calls.load(Ordering::SeqCst), 0);
        assert_eq!(slots(&store, &created.id).current_players, 2);
        assert_eq!(store.local()[0].slots().unwrap().current_players, 2);

        let persisted: Vec<Match> =
            serde_json::from_str(&kv.read(LOCAL_MATCHES_KEY).await.unwrap().unwrap()).unwrap();
        assert_eq!(persisted[0].slots().unwrap().current_players, 2);
    }

    #[tokio::test]
    async fn offline_refresh_uses_fallback_and_keeps_locals() {
        let mut store = store(FakeMatches::default()).with_fallback(vec![player_match("1", 10, 14)]);
        let local = store.create(team_draft("FC Test")).await;

        let visible = ids(store.refresh(&MatchQuery::default()).await)
            .into_iter()
            .map(str::to_owned)
            .collect::<Vec<_>>();
        assert_eq!(visible, [local.id.clone(), "1".to_owned()]);
        assert!(store.error().is_some());
    }

    #[tokio::test]
    async fn discard_removes_only_local_matches() {
        let kv = Arc::new(MemoryStore::new());
        let source = FakeMatches::serving(vec![player_match("srv1", 3, 10)]);
        let mut store = store_with(source, kv.clone(), SlotPolicy::Optimistic);
        let local = store.create(team_draft("FC Test")).await;
        store.refresh(&MatchQuery::default()).await;

        assert!(!store.discard_local("srv1").await);
        assert!(store.discard_local(&local.id).await);
        assert!(!store.discard_local(&local.id).await);
        assert_eq!(ids(store.matches()), ["srv1"]);
        assert_eq!(kv.read(LOCAL_MATCHES_KEY).await.unwrap(), None);
    }

    #[tokio::test]
    async fn discarding_one_of_two_keeps_the_other_persisted() {
        let kv = Arc::new(MemoryStore::new());
        let mut store = store_with(FakeMatches::default(), kv.clone(), SlotPolicy::Optimistic);
        let first = store.create(team_draft("FC One")).await;
        let second = store.create(team_draft("FC Two")).await;

        assert!(store.discard_local(&first.id).await);
        let persisted: Vec<Match> =
            serde_json::from_str(&kv.read(LOCAL_MATCHES_KEY).await.unwrap().unwrap()).unwrap();
        assert_eq!(persisted, vec![second]);
    }

    #[tokio::test]
    async fn local_matches_reload_from_disk_in_front() {
        let dir = tempfile::tempdir().unwrap();
        let on_disk = || {
            let kv: Arc<dyn KeyValueStore> = Arc::new(JsonDirStore::new(dir.path()));
            LocalEntities::new(kv, LOCAL_MATCHES_KEY)
        };

        let mut first_run = MatchStore::new(
            Arc::new(FakeMatches::default()),
            on_disk(),
            EventSink::new(),
            SlotPolicy::Optimistic,
        );
        let team = first_run.create(team_draft("FC Test")).await;
        let pickup = first_run.create(player_draft(FieldSize::SevenASide)).await;
        drop(first_run);

        let mut second_run = MatchStore::new(
            Arc::new(FakeMatches::serving(vec![player_match("srv1", 3, 10)])),
            on_disk(),
            EventSink::new(),
            SlotPolicy::Optimistic,
        );
        second_run.initialize(&MatchQuery::default()).await;

        assert_eq!(ids(second_run.matches()), [pickup.id.as_str(), team.id.as_str(), "srv1"]);
        assert_eq!(second_run.find(&team.id).unwrap().kind, team.kind);
        assert_eq!(second_run.find(&pickup.id).unwrap().kind, pickup.kind);
        assert!(second_run.local().iter().all(|m| m.is_local));
    }

    #[tokio::test]
    async fn details_bring_the_roster_and_refresh_the_held_copy() {
        let fresher = player_match("srv1", 5, 10);
        let source = FakeMatches {
            remote: Mutex::new(Some(vec![player_match("srv1", 3, 10)])),
            detail: Some(MatchDetail { game: fresher.clone(), players: Vec::new() }),
            roster: Some(vec![player("Amine"), player("Yacine")]),
            ..FakeMatches::default()
        };
        let mut store = store(source);
        store.refresh(&MatchQuery::default()).await;

        let detail = store.details("srv1").await.unwrap();
        assert_eq!(detail.game, fresher);
        assert_eq!(detail.players, vec![player("Amine"), player("Yacine")]);
        assert_eq!(store.find("srv1"), Some(&fresher));
    }

    #[tokio::test]
    async fn details_fall_back_to_the_held_copy() {
        let mut store = store(FakeMatches::serving(vec![player_match("srv1", 3, 10)]));
        store.refresh(&MatchQuery::default()).await;

        let detail = store.details("srv1").await.unwrap();
        assert_eq!(detail.game.id, "srv1");
        assert!(detail.players.is_empty());
        assert!(store.error().is_some());
        assert!(store.details("nowhere").await.is_none());

        let local = store.create(team_draft("FC Test")).await;
        let detail = store.details(&local.id).await.unwrap();
        assert_eq!(detail.game, local);
        assert_eq!(store.error(), None);
    }

    #[tokio::test]
    async fn chips_filter_by_skill_and_type() {
        let mut advanced = player_match("adv", 3, 10);
        advanced.skill_level = SkillLevel::Advanced;
        let source = FakeMatches::serving(vec![advanced, player_match("mid", 3, 10)]);
        let mut store = store(source);
        store.create(team_draft("FC Test")).await;
        store.refresh(&MatchQuery::default()).await;
        let total = store.visible().len();

        let only_advanced = store.apply_filters(MatchFilters {
            skill_level: Some(SkillLevel::Advanced),
            match_type: None,
        });
        assert_eq!(ids(only_advanced), ["adv"]);

        let teams = store.apply_filters(MatchFilters { skill_level: None, match_type: Some(MatchType::Team) });
        assert_eq!(teams.len(), 1);

        assert_eq!(store.clear_filters().len(), total);
        assert_eq!(store.matches().len(), total);
    }
}
