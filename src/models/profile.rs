//! 用户档案模型
//!
//! `user_id` 是唯一用于集合成员判断的字段；其余字段都是展示用元数据，
//! 可能缺失，也可能在两次抓取之间过期。

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// 一次抓取中发现的单个账号
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileSummary {
    /// 从个人主页链接中提取的稳定标识
    pub user_id: String,
    /// 尽力而为的显示名称（取抓取文本里第一个非数字行）
    pub username: String,
    /// 由 user_id 拼出的规范主页地址
    pub profile_url: String,
    /// 头像地址，抓取不到则为空
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    /// 经验值文本，仅用于展示
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xp_text: Option<String>,
}

impl ProfileSummary {
    /// 由 user_id 拼出规范主页地址
    pub fn profile_url_for(base_url: &str, user_id: &str) -> String {
        format!("{}/u/{}", base_url.trim_end_matches('/'), user_id)
    }
}

/// 一次分析中抓到的账号集合
///
/// 以 `user_id` 为键；重复抓到同一账号时后到的覆盖先到的。
/// 用 BTreeMap 保证遍历顺序确定，`clean` 截取前 N 个才有意义。
pub type Collection = BTreeMap<String, ProfileSummary>;
