use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Key 解析错误
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum KeyError {
    #[error("invalid course key: '{0}'")]
    InvalidCourseKey(String),
    #[error("invalid usage key: '{0}'")]
    InvalidUsageKey(String),
}

const COURSE_PREFIX: &str = "course-v1:";
const BLOCK_PREFIX: &str = "block-v1:";
const LIB_BLOCK_PREFIX: &str = "lib-block-v1:";
const LEGACY_BLOCK_PREFIX: &str = "i4x://";

/// 单个 Key 片段是否合法 (org / course / run / block id)
fn is_valid_part(part: &str) -> bool {
    !part.is_empty()
        && part
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '~' | '%'))
}

/// 解析 `type@xxx` / `block@xxx` 形式的标签片段
fn tagged<'a>(part: &'a str, tag: &str) -> Option<&'a str> {
    part.strip_prefix(tag)
        .and_then(|rest| rest.strip_prefix('@'))
        .filter(|v| is_valid_part(v))
}

// ==========================================
// 1. 课程 Key (CourseKey)
// ==========================================

/// 结构化课程标识
///
/// 支持两种格式：
/// - 标准格式: `course-v1:ORG+COURSE+RUN`
/// - 旧格式 (deprecated): `ORG/COURSE/RUN`
///
/// 两种格式即使字段相同也被视为不同的 Key。
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CourseKey {
    pub org: String,
    pub course: String,
    pub run: String,
    /// 是否由旧格式解析而来
    pub deprecated: bool,
}

impl CourseKey {
    pub fn new(org: &str, course: &str, run: &str) -> Self {
        Self {
            org: org.to_string(),
            course: course.to_string(),
            run: run.to_string(),
            deprecated: false,
        }
    }

    /// 解析标准格式 `course-v1:ORG+COURSE+RUN`
    pub fn parse_primary(s: &str) -> Result<Self, KeyError> {
        let err = || KeyError::InvalidCourseKey(s.to_string());
        let body = s.strip_prefix(COURSE_PREFIX).ok_or_else(err)?;
        match body.split('+').collect::<Vec<_>>().as_slice() {
            [org, course, run] if [org, course, run].iter().all(|p| is_valid_part(p)) => {
                Ok(Self::new(org, course, run))
            }
            _ => Err(err()),
        }
    }

    /// 解析旧格式 `ORG/COURSE/RUN`
    pub fn parse_legacy(s: &str) -> Result<Self, KeyError> {
        match s.split('/').collect::<Vec<_>>().as_slice() {
            [org, course, run] if [org, course, run].iter().all(|p| is_valid_part(p)) => {
                Ok(Self {
                    deprecated: true,
                    ..Self::new(org, course, run)
                })
            }
            _ => Err(KeyError::InvalidCourseKey(s.to_string())),
        }
    }
}

impl FromStr for CourseKey {
    type Err = KeyError;

    /// 先尝试标准格式，失败后回退到旧格式
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_primary(s)
            .or_else(|_| Self::parse_legacy(s))
            .map_err(|_| KeyError::InvalidCourseKey(s.to_string()))
    }
}

impl fmt::Display for CourseKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.deprecated {
            write!(f, "{}/{}/{}", self.org, self.course, self.run)
        } else {
            write!(f, "{}{}+{}+{}", COURSE_PREFIX, self.org, self.course, self.run)
        }
    }
}

impl TryFrom<String> for CourseKey {
    type Error = KeyError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CourseKey> for String {
    fn from(key: CourseKey) -> Self {
        key.to_string()
    }
}

// ==========================================
// 2. 内容库 Key (LibraryKey)
// ==========================================

/// 内容库标识 (`library-v1:ORG+LIBRARY`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LibraryKey {
    pub org: String,
    pub library: String,
}

impl LibraryKey {
    pub fn new(org: &str, library: &str) -> Self {
        Self {
            org: org.to_string(),
            library: library.to_string(),
        }
    }
}

// ==========================================
// 3. 内容定位 Key (UsageKey)
// ==========================================

/// 内容单元的结构化定位
///
/// - 课程内容: `block-v1:ORG+COURSE+RUN+type@TYPE+block@ID`
/// - 旧格式课程的内容: `i4x://ORG/COURSE/RUN/TYPE/ID`
/// - 内容库内容: `lib-block-v1:ORG+LIBRARY+type@TYPE+block@ID`
///
/// 旧格式课程的内容使用独立的字符串形式，保证与同名标准课程的内容不会冲突。
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum UsageKey {
    Course {
        course: CourseKey,
        block_type: String,
        block_id: String,
    },
    Library {
        library: LibraryKey,
        block_type: String,
        block_id: String,
    },
}

impl UsageKey {
    pub fn course_block(course: &CourseKey, block_type: &str, block_id: &str) -> Self {
        UsageKey::Course {
            course: course.clone(),
            block_type: block_type.to_string(),
            block_id: block_id.to_string(),
        }
    }

    pub fn library_block(library: &LibraryKey, block_type: &str, block_id: &str) -> Self {
        UsageKey::Library {
            library: library.clone(),
            block_type: block_type.to_string(),
            block_id: block_id.to_string(),
        }
    }

    /// 是否属于内容库 (内容库内容没有发布状态)
    pub fn is_library(&self) -> bool {
        matches!(self, UsageKey::Library { .. })
    }

    pub fn block_type(&self) -> &str {
        match self {
            UsageKey::Course { block_type, .. } | UsageKey::Library { block_type, .. } => {
                block_type
            }
        }
    }

    pub fn block_id(&self) -> &str {
        match self {
            UsageKey::Course { block_id, .. } | UsageKey::Library { block_id, .. } => block_id,
        }
    }
}

impl FromStr for UsageKey {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || KeyError::InvalidUsageKey(s.to_string());

        if let Some(body) = s.strip_prefix(LIB_BLOCK_PREFIX) {
            return match body.split('+').collect::<Vec<_>>().as_slice() {
                [org, library, ty, id] if is_valid_part(org) && is_valid_part(library) => {
                    let block_type = tagged(ty, "type").ok_or_else(err)?;
                    let block_id = tagged(id, "block").ok_or_else(err)?;
                    Ok(Self::library_block(
                        &LibraryKey::new(org, library),
                        block_type,
                        block_id,
                    ))
                }
                _ => Err(err()),
            };
        }

        if let Some(body) = s.strip_prefix(LEGACY_BLOCK_PREFIX) {
            return match body.split('/').collect::<Vec<_>>().as_slice() {
                [org, course, run, ty, id]
                    if [org, course, run, ty, id].iter().all(|p| is_valid_part(p)) =>
                {
                    let course = CourseKey {
                        deprecated: true,
                        ..CourseKey::new(org, course, run)
                    };
                    Ok(Self::course_block(&course, ty, id))
                }
                _ => Err(err()),
            };
        }

        let body = s.strip_prefix(BLOCK_PREFIX).ok_or_else(err)?;
        match body.split('+').collect::<Vec<_>>().as_slice() {
            [org, course, run, ty, id] if [org, course, run].iter().all(|p| is_valid_part(p)) => {
                let block_type = tagged(ty, "type").ok_or_else(err)?;
                let block_id = tagged(id, "block").ok_or_else(err)?;
                Ok(Self::course_block(
                    &CourseKey::new(org, course, run),
                    block_type,
                    block_id,
                ))
            }
            _ => Err(err()),
        }
    }
}

impl fmt::Display for UsageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UsageKey::Course {
                course,
                block_type,
                block_id,
            } if course.deprecated => write!(
                f,
                "{}{}/{}/{}/{}/{}",
                LEGACY_BLOCK_PREFIX, course.org, course.course, course.run, block_type, block_id
            ),
            UsageKey::Course {
                course,
                block_type,
                block_id,
            } => write!(
                f,
                "{}{}+{}+{}+type@{}+block@{}",
                BLOCK_PREFIX, course.org, course.course, course.run, block_type, block_id
            ),
            UsageKey::Library {
                library,
                block_type,
                block_id,
            } => write!(
                f,
                "{}{}+{}+type@{}+block@{}",
                LIB_BLOCK_PREFIX, library.org, library.library, block_type, block_id
            ),
        }
    }
}

impl TryFrom<String> for UsageKey {
    type Error = KeyError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<UsageKey> for String {
    fn from(key: UsageKey) -> Self {
        key.to_string()
    }
}
