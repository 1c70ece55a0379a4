use serde_json::{Map, Value};
use url::Url;

/// 单张照片字段，按优先级排列
const SINGLE_URL_FIELDS: &[&str] = &[
    "profilePhoto",
    "photoURL",
    "photoUrl",
    "imageUrl",
    "imageURL",
    "image",
    "photo",
];

/// 照片数组字段，按优先级排列
const URL_ARRAY_FIELDS: &[&str] = &["photos", "photoURLs", "photoUrls", "images"];

/// 以对象形式存放照片的字段
const URL_OBJECT_FIELD: &str = "photos";

const PLACEHOLDER_BASE: &str = "https://placehold.co/400x400";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPhotos {
    pub profile_photo: String,
    pub photos: Vec<String>,
}

impl ResolvedPhotos {
    fn from_list(photos: Vec<String>) -> Option<Self> {
        let profile_photo = photos.first()?.clone();
        Some(Self {
            profile_photo,
            photos,
        })
    }
}

/// 能从宠物记录中提取照片的来源
pub trait PhotoSource: Send + Sync {
    fn extract(&self, fields: &Map<String, Value>) -> Option<ResolvedPhotos>;
}

pub struct SingleUrlField(pub &'static [&'static str]);

impl PhotoSource for SingleUrlField {
    fn extract(&self, fields: &Map<String, Value>) -> Option<ResolvedPhotos> {
        self.0.iter().find_map(|name| match fields.get(*name) {
            Some(Value::String(url)) if !url.trim().is_empty() => {
                ResolvedPhotos::from_list(vec![url.clone()])
            }
            _ => None,
        })
    }
}

pub struct UrlArrayField(pub &'static [&'static str]);

impl PhotoSource for UrlArrayField {
    fn extract(&self, fields: &Map<String, Value>) -> Option<ResolvedPhotos> {
        self.0.iter().find_map(|name| match fields.get(*name) {
            Some(Value::Array(items)) => ResolvedPhotos::from_list(string_urls(items.iter())),
            _ => None,
        })
    }
}

pub struct UrlObjectField(pub &'static str);

impl PhotoSource for UrlObjectField {
    fn extract(&self, fields: &Map<String, Value>) -> Option<ResolvedPhotos> {
        match fields.get(self.0) {
            Some(Value::Object(items)) => ResolvedPhotos::from_list(string_urls(items.values())),
            _ => None,
        }
    }
}

fn string_urls<'a>(values: impl Iterator<Item = &'a Value>) -> Vec<String> {
    values
        .filter_map(Value::as_str)
        .filter(|url| !url.trim().is_empty())
        .map(str::to_string)
        .collect()
}

/// 按顺序尝试各个照片来源，都失败时生成占位图
pub struct PhotoResolver {
    sources: Vec<Box<dyn PhotoSource>>,
}

impl Default for PhotoResolver {
    fn default() -> Self {
        Self::new(vec![
            Box::new(SingleUrlField(SINGLE_URL_FIELDS)),
            Box::new(UrlArrayField(URL_ARRAY_FIELDS)),
            Box::new(UrlObjectField(URL_OBJECT_FIELD)),
        ])
    }
}

impl PhotoResolver {
    pub fn new(sources: Vec<Box<dyn PhotoSource>>) -> Self {
        Self { sources }
    }

    pub fn resolve(&self, fields: &Map<String, Value>, name: &str, kind: &str) -> ResolvedPhotos {
        self.sources
            .iter()
            .find_map(|source| source.extract(fields))
            .unwrap_or_else(|| {
                let url = placeholder_url(name, kind);
                ResolvedPhotos {
                    profile_photo: url.clone(),
                    photos: vec![url],
                }
            })
    }
}

fn category_glyph(kind: &str) -> Option<&'static str> {
    match kind.to_ascii_lowercase().as_str() {
        "dog" => Some("🐕"),
        "cat" => Some("🐈"),
        "bird" => Some("🐦"),
        "rabbit" => Some("🐇"),
        "fish" => Some("🐠"),
        "hamster" => Some("🐹"),
        "reptile" => Some("🦎"),
        "horse" => Some("🐎"),
        _ => None,
    }
}

pub fn placeholder_url(name: &str, kind: &str) -> String {
    let text = match category_glyph(kind) {
        Some(glyph) => format!("{} {}", glyph, name),
        None => name.to_string(),
    };

    match Url::parse_with_params(PLACEHOLDER_BASE, &[("text", text.as_str())]) {
        Ok(url) => url.to_string(),
        Err(_) => PLACEHOLDER_BASE.to_string(),
    }
}
