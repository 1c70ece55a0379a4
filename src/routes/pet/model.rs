use std::collections::HashMap;

use futures_util::future::try_join3;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::cache::ResultCache;
use crate::config::StorePaths;
use crate::store::{RecordStore, StoreError};
use crate::utils::distance_km;

use super::photo::PhotoResolver;

pub const DEFAULT_RADIUS: f64 = 10_000.0;
pub const DEFAULT_LIMIT: usize = 20;

const DEFAULT_PET_TYPE: &str = "other";
const DEFAULT_PET_NAME: &str = "Pet";
const DEFAULT_OWNER_NAME: &str = "Pet Owner";

/// 主人的位置记录，按主人ID存储
///
/// 字段类型不对时按缺失处理，不丢弃整条记录。
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationRecord {
    #[serde(default, deserialize_with = "lenient::number")]
    pub lat: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub lng: Option<f64>,
    #[serde(default, deserialize_with = "lenient::truthy")]
    pub active: bool,
    #[serde(default, deserialize_with = "lenient::string")]
    pub active_pet_id: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub timestamp: Option<String>,
}

/// 宠物记录，按 主人ID -> 宠物ID 存储
///
/// 照片字段的格式不固定，统一保留在 `extra` 中交给 [`PhotoResolver`] 处理。
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PetRecord {
    #[serde(default, deserialize_with = "lenient::string")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub name: Option<String>,
    #[serde(rename = "type", default, deserialize_with = "lenient::string")]
    pub kind: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub breed: Option<String>,
    pub age: Option<Value>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub gender: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub description: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerProfile {
    #[serde(default, deserialize_with = "lenient::string")]
    pub display_name: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub first_name: Option<String>,
}

impl OwnerProfile {
    /// 优先使用 displayName，其次 firstName
    pub fn resolved_name(&self) -> Option<&str> {
        [&self.display_name, &self.first_name]
            .into_iter()
            .flatten()
            .map(|name| name.trim())
            .find(|name| !name.is_empty())
    }
}

/// 宽松的标量解码，数据库里同一字段可能被不同客户端写成不同类型
mod lenient {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    /// 字符串原样保留，数字和布尔转成字符串，其他类型视为缺失
    pub fn string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::String(s) => Some(s),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        })
    }

    /// 数字或可解析的数字字符串
    pub fn number<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        })
    }

    /// 按 JSON 的真值语义判断：false、0、空字符串和 null 为假
    pub fn truthy<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::Null => false,
            Value::Bool(b) => b,
            Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0 && !n.is_nan()),
            Value::String(s) => !s.is_empty(),
            Value::Array(_) | Value::Object(_) => true,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

/// 返回给客户端的附近宠物
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NearbyPet {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub breed: Option<String>,
    pub age: Option<Value>,
    pub gender: Option<String>,
    pub description: Option<String>,
    pub owner_id: String,
    pub owner_name: String,
    /// 距离（米）
    pub distance: u64,
    pub location: Coordinates,
    pub last_active: Option<String>,
    pub profile_photo: String,
    pub photos: Vec<String>,
}

/// 经过校验的查询参数
#[derive(Debug, Clone, PartialEq)]
pub struct NearbySearch {
    pub latitude: f64,
    pub longitude: f64,
    pub radius: f64,
    pub limit: usize,
    pub include_all: bool,
}

impl NearbySearch {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            radius: DEFAULT_RADIUS,
            limit: DEFAULT_LIMIT,
            include_all: false,
        }
    }

    pub fn cache_key(&self) -> String {
        format!(
            "{}:{}:{}:{}:{}",
            self.latitude, self.longitude, self.radius, self.limit, self.include_all
        )
    }
}

/// 聚合阶段产生的候选，照片在排序截断之后才解析
#[derive(Debug, Clone)]
struct Candidate<'a> {
    pet_id: &'a str,
    pet: &'a PetRecord,
    owner_id: &'a str,
    owner_name: &'a str,
    distance: u64,
    location: Coordinates,
    last_active: Option<&'a str>,
}

pub type PetsByOwner = HashMap<String, Vec<(String, PetRecord)>>;

/// 一次查询读取到的三个数据集
#[derive(Debug, Default)]
pub struct Snapshot {
    pub locations: Vec<(String, LocationRecord)>,
    pub pets: PetsByOwner,
    pub profiles: HashMap<String, OwnerProfile>,
}

impl Snapshot {
    pub fn from_values(
        locations: Option<Value>,
        pets: Option<Value>,
        profiles: Option<Value>,
    ) -> Self {
        let pets = entries(pets)
            .into_iter()
            .map(|(owner_id, owned)| {
                let owned = decode_entries::<PetRecord>(Some(owned), "pet");
                (owner_id, owned)
            })
            .filter(|(_, owned)| !owned.is_empty())
            .collect();

        Self {
            locations: decode_entries(locations, "location"),
            pets,
            profiles: decode_entries::<OwnerProfile>(profiles, "profile")
                .into_iter()
                .collect(),
        }
    }
}

fn entries(value: Option<Value>) -> Vec<(String, Value)> {
    match value {
        Some(Value::Object(map)) => map.into_iter().collect(),
        _ => Vec::new(),
    }
}

/// 逐条解码，格式不对的记录跳过
fn decode_entries<T: DeserializeOwned>(value: Option<Value>, kind: &str) -> Vec<(String, T)> {
    entries(value)
        .into_iter()
        .filter_map(|(key, raw)| match serde_json::from_value::<T>(raw) {
            Ok(record) => Some((key, record)),
            Err(e) => {
                tracing::warn!("Skipping malformed {} record {}: {}", kind, key, e);
                None
            }
        })
        .collect()
}

/// 四舍五入到米，保证结果不超过半径
fn rounded_meters(distance: f64, radius: f64) -> u64 {
    let rounded = distance.round();
    let meters = if rounded > radius { distance.floor() } else { rounded };
    meters.max(0.0) as u64
}

fn aggregate<'a>(search: &NearbySearch, snapshot: &'a Snapshot) -> Vec<Candidate<'a>> {
    let mut candidates = Vec::new();

    for (owner_id, location) in &snapshot.locations {
        if !location.active {
            continue;
        }
        let (Some(lat), Some(lng)) = (location.lat, location.lng) else {
            continue;
        };

        let distance = distance_km(search.latitude, search.longitude, lat, lng) * 1000.0;
        // NaN 也会在这里被过滤
        if !(distance <= search.radius) {
            continue;
        }

        let Some(owned) = snapshot.pets.get(owner_id) else {
            continue;
        };

        let active = if search.include_all {
            None
        } else {
            location
                .active_pet_id
                .as_deref()
                .and_then(|active_id| owned.iter().find(|(pet_id, _)| pet_id == active_id))
        };
        let selected = match active {
            Some(pet) => std::slice::from_ref(pet),
            None => owned.as_slice(),
        };

        let owner_name = snapshot
            .profiles
            .get(owner_id)
            .and_then(OwnerProfile::resolved_name)
            .unwrap_or(DEFAULT_OWNER_NAME);
        let meters = rounded_meters(distance, search.radius);

        for (pet_id, pet) in selected {
            candidates.push(Candidate {
                pet_id,
                pet,
                owner_id,
                owner_name,
                distance: meters,
                location: Coordinates { lat, lng },
                last_active: location.timestamp.as_deref(),
            });
        }
    }

    candidates
}

fn normalize(candidate: Candidate<'_>, photos: &PhotoResolver) -> NearbyPet {
    let pet = candidate.pet;
    let name = pet
        .name
        .as_deref()
        .filter(|name| !name.trim().is_empty())
        .unwrap_or(DEFAULT_PET_NAME)
        .to_string();
    let kind = pet
        .kind
        .as_deref()
        .filter(|kind| !kind.trim().is_empty())
        .unwrap_or(DEFAULT_PET_TYPE)
        .to_string();
    let resolved = photos.resolve(&pet.extra, &name, &kind);

    NearbyPet {
        id: pet.id.clone().unwrap_or_else(|| candidate.pet_id.to_string()),
        name,
        kind,
        breed: pet.breed.clone(),
        age: pet.age.clone(),
        gender: pet.gender.clone(),
        description: pet.description.clone(),
        owner_id: candidate.owner_id.to_string(),
        owner_name: candidate.owner_name.to_string(),
        distance: candidate.distance,
        location: candidate.location,
        last_active: candidate.last_active.map(str::to_string),
        profile_photo: resolved.profile_photo,
        photos: resolved.photos,
    }
}

/// 从快照中计算附近宠物：过滤、按距离稳定排序、截断、解析照片
pub fn rank_nearby(
    search: &NearbySearch,
    snapshot: &Snapshot,
    photos: &PhotoResolver,
) -> Vec<NearbyPet> {
    let mut candidates = aggregate(search, snapshot);
    candidates.sort_by_key(|candidate| candidate.distance);
    candidates.truncate(search.limit);

    candidates
        .into_iter()
        .map(|candidate| normalize(candidate, photos))
        .collect()
}

impl NearbyPet {
    pub async fn find_nearby(
        store: &dyn RecordStore,
        cache: &ResultCache<Vec<NearbyPet>>,
        paths: &StorePaths,
        search: &NearbySearch,
    ) -> Result<Vec<Self>, StoreError> {
        let cache_key = search.cache_key();
        if let Some(pets) = cache.get(&cache_key) {
            tracing::debug!("Get nearby pets from cache: {}", cache_key);
            return Ok(pets);
        }

        // 三个数据集互不依赖，并发读取后再聚合
        let (locations, pets, profiles) = try_join3(
            store.read(&paths.locations),
            store.read(&paths.pets),
            store.read(&paths.profiles),
        )
        .await?;

        let snapshot = Snapshot::from_values(locations, pets, profiles);
        let nearby = if snapshot.locations.is_empty() {
            Vec::new()
        } else {
            rank_nearby(search, &snapshot, &PhotoResolver::default())
        };

        cache.put(cache_key.clone(), nearby.clone());
        tracing::debug!(
            "Set nearby pets to cache: {} ({} results)",
            cache_key,
            nearby.len()
        );

        Ok(nearby)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::cache::ManualClock;
    use crate::routes::pet::photo::placeholder_url;
    use crate::store::MemoryStore;

    const ORIGIN: (f64, f64) = (37.7749, -122.4194);
    // 纬度方向 5km 和 15km 的偏移量
    const FIVE_KM_LAT: f64 = 5.0 / 111.19492664455873;
    const FIFTEEN_KM_LAT: f64 = 15.0 / 111.19492664455873;

    fn search() -> NearbySearch {
        NearbySearch::new(ORIGIN.0, ORIGIN.1)
    }

    fn location(lat: f64, active: bool) -> Value {
        json!({
            "lat": lat,
            "lng": ORIGIN.1,
            "active": active,
            "timestamp": "2026-10-01T12:00:00Z"
        })
    }

    fn cache() -> ResultCache<Vec<NearbyPet>> {
        ResultCache::new(Duration::from_secs(5), ManualClock::new())
    }

    async fn find(store: &MemoryStore, search: &NearbySearch) -> Vec<NearbyPet> {
        NearbyPet::find_nearby(store, &cache(), &StorePaths::default(), search)
            .await
            .unwrap()
    }

    fn two_owner_store() -> MemoryStore {
        MemoryStore::new(json!({
            "locations": {
                "far": location(ORIGIN.0 + FIVE_KM_LAT, true),
                "near": location(ORIGIN.0, true)
            },
            "pets": {
                "near": { "p1": { "name": "Rex", "type": "dog", "photoURL": "https://img/rex.jpg" } },
                "far": { "p2": { "name": "Tom", "type": "cat" } }
            },
            "users": {
                "near": { "displayName": "Ada", "firstName": "Ignored" },
                "far": { "firstName": "Bo" }
            }
        }))
    }

    #[tokio::test]
    async fn returns_nearest_first() {
        let pets = find(&two_owner_store(), &search()).await;

        assert_eq!(pets.len(), 2);
        assert_eq!(pets[0].owner_id, "near");
        assert_eq!(pets[0].owner_name, "Ada");
        assert_eq!(pets[0].distance, 0);
        assert_eq!(pets[0].profile_photo, "https://img/rex.jpg");
        assert_eq!(pets[0].last_active.as_deref(), Some("2026-10-01T12:00:00Z"));

        assert_eq!(pets[1].owner_id, "far");
        assert_eq!(pets[1].owner_name, "Bo");
        assert!(pets[1].distance.abs_diff(5000) <= 5, "got {}", pets[1].distance);
    }

    #[tokio::test]
    async fn excludes_owners_outside_radius() {
        let store = MemoryStore::new(json!({
            "locations": { "o1": location(ORIGIN.0 + FIFTEEN_KM_LAT, true) },
            "pets": { "o1": { "p1": { "name": "Rex" } } }
        }));
        assert!(find(&store, &search()).await.is_empty());
    }

    #[tokio::test]
    async fn excludes_inactive_owners() {
        let store = MemoryStore::new(json!({
            "locations": {
                "o1": location(ORIGIN.0, false),
                "o2": { "lat": ORIGIN.0, "lng": ORIGIN.1 }
            },
            "pets": {
                "o1": { "p1": { "name": "Rex" } },
                "o2": { "p2": { "name": "Tom" } }
            }
        }));
        assert!(find(&store, &search()).await.is_empty());
    }

    #[tokio::test]
    async fn skips_locations_without_coordinates_or_pets() {
        let store = MemoryStore::new(json!({
            "locations": {
                "no-lng": { "lat": ORIGIN.0, "active": true },
                "no-pets": location(ORIGIN.0, true),
                "broken": "not a record",
                "ok": location(ORIGIN.0, true)
            },
            "pets": {
                "no-lng": { "p1": { "name": "Rex" } },
                "ok": { "p2": { "name": "Tom" } }
            }
        }));

        let pets = find(&store, &search()).await;
        assert_eq!(pets.len(), 1);
        assert_eq!(pets[0].owner_id, "ok");
    }

    fn three_pet_store() -> MemoryStore {
        let mut owner = location(ORIGIN.0, true);
        owner["activePetId"] = json!("p2");
        MemoryStore::new(json!({
            "locations": { "o1": owner },
            "pets": {
                "o1": {
                    "p1": { "name": "A" },
                    "p2": { "name": "B" },
                    "p3": { "name": "C" }
                }
            }
        }))
    }

    #[tokio::test]
    async fn active_pet_narrows_owner_to_one_result() {
        let pets = find(&three_pet_store(), &search()).await;
        assert_eq!(pets.len(), 1);
        assert_eq!(pets[0].id, "p2");
        assert_eq!(pets[0].name, "B");
    }

    #[tokio::test]
    async fn include_all_returns_every_pet() {
        let mut search = search();
        search.include_all = true;
        let pets = find(&three_pet_store(), &search).await;
        let ids: Vec<_> = pets.iter().map(|pet| pet.id.as_str()).collect();
        assert_eq!(ids, vec!["p1", "p2", "p3"]);
    }

    #[tokio::test]
    async fn unknown_active_pet_keeps_all_pets() {
        let store = three_pet_store();
        store.set("locations/o1/activePetId", json!("gone"));
        assert_eq!(find(&store, &search()).await.len(), 3);
    }

    #[tokio::test]
    async fn missing_fields_get_placeholders() {
        let store = MemoryStore::new(json!({
            "locations": { "o1": location(ORIGIN.0, true) },
            "pets": { "o1": { "p1": { "breed": "mixed" } } }
        }));

        let pets = find(&store, &search()).await;
        assert_eq!(pets.len(), 1);
        let pet = &pets[0];
        assert_eq!(pet.id, "p1");
        assert_eq!(pet.name, "Pet");
        assert_eq!(pet.kind, "other");
        assert_eq!(pet.owner_name, "Pet Owner");
        assert_eq!(pet.profile_photo, placeholder_url("Pet", "other"));
        assert_eq!(pet.photos, vec![pet.profile_photo.clone()]);
    }

    #[tokio::test]
    async fn mistyped_pet_fields_keep_the_pet() {
        let store = MemoryStore::new(json!({
            "locations": { "o1": location(ORIGIN.0, true) },
            "pets": {
                "o1": {
                    "p1": { "name": "Rex", "breed": 3, "gender": false },
                    "p2": { "id": 42, "name": "Tom", "type": ["cat"], "description": { "x": 1 } }
                }
            },
            "users": { "o1": { "displayName": 7 } }
        }));

        let pets = find(&store, &search()).await;
        assert_eq!(pets.len(), 2);
        assert_eq!(pets[0].id, "p1");
        assert_eq!(pets[0].breed.as_deref(), Some("3"));
        assert_eq!(pets[0].gender.as_deref(), Some("false"));
        assert_eq!(pets[0].owner_name, "7");
        assert_eq!(pets[1].id, "42");
        assert_eq!(pets[1].kind, "other");
        assert_eq!(pets[1].description, None);
    }

    #[tokio::test]
    async fn truthy_active_and_numeric_active_pet_id() {
        let store = MemoryStore::new(json!({
            "locations": {
                "o1": { "lat": ORIGIN.0, "lng": ORIGIN.1, "active": 1 },
                "o2": { "lat": ORIGIN.0, "lng": ORIGIN.1, "active": true, "activePetId": 7 },
                "o3": { "lat": ORIGIN.0, "lng": ORIGIN.1, "active": 0 },
                "o4": { "lat": ORIGIN.0, "lng": ORIGIN.1, "active": "" }
            },
            "pets": {
                "o1": { "p1": { "name": "Rex" } },
                "o2": { "7": { "name": "Tom" }, "8": { "name": "Pip" } },
                "o3": { "p3": { "name": "Moss" } },
                "o4": { "p4": { "name": "Nib" } }
            }
        }));

        let pets = find(&store, &search()).await;
        let owners: Vec<_> = pets
            .iter()
            .map(|pet| (pet.owner_id.as_str(), pet.name.as_str()))
            .collect();
        assert_eq!(owners, vec![("o1", "Rex"), ("o2", "Tom")]);
    }

    #[tokio::test]
    async fn string_coordinates_are_accepted() {
        let store = MemoryStore::new(json!({
            "locations": {
                "o1": { "lat": ORIGIN.0.to_string(), "lng": ORIGIN.1.to_string(), "active": true },
                "o2": { "lat": "north", "lng": ORIGIN.1, "active": true }
            },
            "pets": {
                "o1": { "p1": { "name": "Rex" } },
                "o2": { "p2": { "name": "Tom" } }
            }
        }));

        let pets = find(&store, &search()).await;
        assert_eq!(pets.len(), 1);
        assert_eq!(pets[0].owner_id, "o1");
    }

    #[tokio::test]
    async fn empty_locations_short_circuit() {
        let store = MemoryStore::new(json!({ "pets": { "o1": { "p1": {} } } }));
        assert!(find(&store, &search()).await.is_empty());
    }

    #[tokio::test]
    async fn results_are_sorted_bounded_and_truncated() {
        let store = MemoryStore::default();
        for i in 0..30 {
            let owner = format!("o{i:02}");
            let lat = ORIGIN.0 + FIVE_KM_LAT * ((i * 7 % 30) as f64) / 10.0;
            store.set(&format!("locations/{owner}"), location(lat, true));
            store.set(&format!("pets/{owner}/p"), json!({ "name": owner }));
        }

        let mut search = search();
        search.limit = 12;
        let pets = find(&store, &search).await;

        assert_eq!(pets.len(), 12);
        assert!(pets.windows(2).all(|w| w[0].distance <= w[1].distance));
        assert!(pets.iter().all(|pet| pet.distance as f64 <= search.radius));
    }

    #[test]
    fn ties_keep_production_order() {
        let snapshot = Snapshot::from_values(
            Some(json!({
                "a": location(ORIGIN.0, true),
                "b": location(ORIGIN.0, true)
            })),
            Some(json!({
                "a": { "p1": { "name": "First" } },
                "b": { "p2": { "name": "Second" } }
            })),
            None,
        );
        let pets = rank_nearby(&search(), &snapshot, &PhotoResolver::default());
        let names: Vec<_> = pets.iter().map(|pet| pet.name.as_str()).collect();
        assert_eq!(names, vec!["First", "Second"]);
    }

    #[test]
    fn rounded_distance_never_exceeds_radius() {
        assert_eq!(rounded_meters(9_999.4, 10_000.0), 9_999);
        assert_eq!(rounded_meters(9_999.6, 10_000.0), 10_000);
        assert_eq!(rounded_meters(99.6, 99.7), 99);
        assert_eq!(rounded_meters(0.0, 0.0), 0);
    }

    #[test]
    fn cache_key_covers_every_parameter() {
        let base = search();
        let mut other = base.clone();
        other.include_all = true;
        assert_ne!(base.cache_key(), other.cache_key());

        let mut other = base.clone();
        other.limit = 5;
        assert_ne!(base.cache_key(), other.cache_key());
    }

    /// 统计读取次数，可以切换为失败
    struct CountingStore {
        inner: MemoryStore,
        reads: AtomicUsize,
        fail: AtomicBool,
    }

    #[async_trait]
    impl RecordStore for CountingStore {
        async fn read(&self, path: &str) -> Result<Option<Value>, StoreError> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) && path == "users" {
                return Err(StoreError::Unavailable("profiles offline".into()));
            }
            self.inner.read(path).await
        }
    }

    fn counting_store() -> CountingStore {
        CountingStore {
            inner: two_owner_store(),
            reads: AtomicUsize::new(0),
            fail: Default::default(),
        }
    }

    #[tokio::test]
    async fn identical_queries_within_ttl_hit_cache() {
        let store = counting_store();
        let clock = ManualClock::new();
        let cache = ResultCache::new(Duration::from_secs(5), clock.clone());
        let paths = StorePaths::default();

        let first = NearbyPet::find_nearby(&store, &cache, &paths, &search()).await.unwrap();
        assert_eq!(store.reads.load(Ordering::SeqCst), 3);

        // 数据变化不影响缓存期内的结果
        store.inner.set("locations/far/active", json!(false));
        clock.advance(Duration::from_secs(4));
        let second = NearbyPet::find_nearby(&store, &cache, &paths, &search()).await.unwrap();
        assert_eq!(store.reads.load(Ordering::SeqCst), 3);
        assert_eq!(
            serde_json::to_vec(&first).unwrap(),
            serde_json::to_vec(&second).unwrap()
        );

        clock.advance(Duration::from_secs(1));
        let third = NearbyPet::find_nearby(&store, &cache, &paths, &search()).await.unwrap();
        assert_eq!(store.reads.load(Ordering::SeqCst), 6);
        assert_eq!(third.len(), 1);
    }

    #[tokio::test]
    async fn failed_reads_are_not_cached() {
        let store = counting_store();
        store.fail.store(true, Ordering::SeqCst);
        let cache = cache();
        let paths = StorePaths::default();

        let result = NearbyPet::find_nearby(&store, &cache, &paths, &search()).await;
        assert!(matches!(result, Err(StoreError::Unavailable(_))));
        assert!(cache.is_empty());

        store.fail.store(false, Ordering::SeqCst);
        let pets = NearbyPet::find_nearby(&store, &cache, &paths, &search()).await.unwrap();
        assert_eq!(pets.len(), 2);
    }
}
