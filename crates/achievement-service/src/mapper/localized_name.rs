//! 多语言名称与数据库三列之间的转换

use crate::service::dto::LocalizedName;

/// 空字符串视为缺失
fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty()).map(str::to_string)
}

/// 由 `(name_en, name_zh_hant, name_zh_hans)` 构造名称，空值不输出
pub fn from_columns(
    en: Option<&str>,
    zh_hant: Option<&str>,
    zh_hans: Option<&str>,
) -> LocalizedName {
    LocalizedName {
        english: non_empty(en),
        traditional_chinese: non_empty(zh_hant),
        simplified_chinese: non_empty(zh_hans),
    }
}

/// 拆成 `(name_en, name_zh_hant, name_zh_hans)` 三列，空字符串写为 NULL
pub fn to_columns(name: &LocalizedName) -> (Option<String>, Option<String>, Option<String>) {
    (
        non_empty(name.english.as_deref()),
        non_empty(name.traditional_chinese.as_deref()),
        non_empty(name.simplified_chinese.as_deref()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_names_become_none() {
        let name = LocalizedName {
            english: Some("".to_string()),
            traditional_chinese: Some("陳大文".to_string()),
            simplified_chinese: None,
        };

        let (en, hant, hans) = to_columns(&name);
        assert_eq!(en, None);
        assert_eq!(hant.as_deref(), Some("陳大文"));
        assert_eq!(hans, None);
    }

    #[test]
    fn test_missing_languages_are_not_serialized() {
        let name = from_columns(Some("Chan Tai Man"), None, Some(" "));
        let json = serde_json::to_value(&name).unwrap();

        assert_eq!(json, serde_json::json!({ "English": "Chan Tai Man" }));
    }
}
