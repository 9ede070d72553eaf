use crate::reconcile::entity::CanonicalDailyRecord;

/// # Summary
/// 可投资范围判定接口，必须以注入方式提供，因为黑名单需要持续维护。
///
/// # Invariants
/// - 判定必须是纯函数：同一记录多次调用结果一致。
pub trait UniverseFilter: Send + Sync {
    /// # Summary
    /// 判断记录是否应被排除。
    ///
    /// # Returns
    /// 排除时返回原因描述，合格时返回 None。
    fn exclusion_reason(&self, record: &CanonicalDailyRecord) -> Option<String>;

    /// 记录是否属于合格的股票范围。
    fn is_eligible(&self, record: &CanonicalDailyRecord) -> bool {
        self.exclusion_reason(record).is_none()
    }
}
