//! 列表对比 - 业务能力层
//!
//! 只负责"算出未回关集合"这一件事：纯函数，不碰页面，不发事件。

use crate::models::Collection;

/// 计算未回关集合
///
/// 返回 `following` 中所有 `user_id` 不出现在 `followers` 里的条目，
/// 保留完整的档案信息。两个输入都不会被修改。
pub fn reconcile(followers: &Collection, following: &Collection) -> Collection {
    following
        .iter()
        .filter(|(user_id, _)| !followers.contains_key(*user_id))
        .map(|(user_id, user)| (user_id.clone(), user.clone()))
        .collect()
}
