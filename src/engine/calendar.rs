// ==========================================
// 柜员轮班排班引擎 - 营业日历解析
// ==========================================
// 职责: 统一"今天是哪一天"的裁决, 所有按日操作从这里取参考日
// 说明: 时钟源可注入, 测试可冻结在任意时刻; 生产默认 Utc::now
// ==========================================

use crate::engine::error::{RotationError, RotationResult};
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, TimeZone, Utc};
use std::sync::Arc;

/// day_key 的规范存储格式
pub const DAY_KEY_FORMAT: &str = "%Y-%m-%d";

/// 时钟源: 返回当前 UTC 时刻
pub type NowSource = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

// ==========================================
// CalendarResolver - 营业日历解析器
// ==========================================
/// 营业日历解析器
///
/// 参考日 = 当前时刻换算到营业时区后的民用日期,
/// 再按偏移量 (0=今天, 1=明天) 平移
pub struct CalendarResolver {
    tz: FixedOffset,
    now_source: NowSource,
}

impl CalendarResolver {
    /// 按营业时区偏移创建 (时钟源为系统时钟)
    ///
    /// # 参数
    /// - `utc_offset_hours`: 相对 UTC 的小时偏移, 如 9 表示 UTC+9
    pub fn new(utc_offset_hours: i32) -> RotationResult<Self> {
        let tz = FixedOffset::east_opt(utc_offset_hours * 3600).ok_or_else(|| {
            RotationError::Validation(format!("无效的时区偏移: {utc_offset_hours} 小时"))
        })?;
        Ok(Self {
            tz,
            now_source: Arc::new(Utc::now),
        })
    }

    /// 按营业时区偏移 + 注入时钟源创建 (测试用)
    pub fn with_now_source(
        utc_offset_hours: i32,
        now_source: NowSource,
    ) -> RotationResult<Self> {
        let mut resolver = Self::new(utc_offset_hours)?;
        resolver.now_source = now_source;
        Ok(resolver)
    }

    /// 冻结在指定民用日期 (测试用, 取当日正午避开时区边界)
    pub fn frozen_at(utc_offset_hours: i32, day: NaiveDate) -> RotationResult<Self> {
        let tz = FixedOffset::east_opt(utc_offset_hours * 3600).ok_or_else(|| {
            RotationError::Validation(format!("无效的时区偏移: {utc_offset_hours} 小时"))
        })?;
        let noon = day.and_hms_opt(12, 0, 0).ok_or_else(|| {
            RotationError::Validation(format!("无效的冻结日期: {day}"))
        })?;
        let instant = tz
            .from_local_datetime(&noon)
            .single()
            .ok_or_else(|| RotationError::Validation(format!("无效的冻结时刻: {noon}")))?
            .with_timezone(&Utc);
        Ok(Self {
            tz,
            now_source: Arc::new(move || instant),
        })
    }

    /// 当前 UTC 时刻 (排班记录 assigned_at 统一从此取)
    pub fn now_utc(&self) -> DateTime<Utc> {
        (self.now_source)()
    }

    /// 营业时区下的今日民用日期
    pub fn today(&self) -> NaiveDate {
        self.now_utc().with_timezone(&self.tz).date_naive()
    }

    /// 按偏移量解析目标日 (0=今天, 1=明天, 负数为回看)
    pub fn resolve(&self, offset_days: i64) -> RotationResult<NaiveDate> {
        self.add_days(self.today(), offset_days)
    }

    /// 日期平移 (溢出视为无效输入)
    pub fn add_days(&self, day: NaiveDate, offset_days: i64) -> RotationResult<NaiveDate> {
        day.checked_add_signed(Duration::days(offset_days))
            .ok_or_else(|| {
                RotationError::Validation(format!("日期偏移越界: {day} + {offset_days} 天"))
            })
    }

    /// 解析 day_key 字符串 (严格 YYYY-MM-DD, 不接受非补零写法)
    pub fn parse_day_key(&self, raw: &str) -> RotationResult<NaiveDate> {
        let parsed = NaiveDate::parse_from_str(raw, DAY_KEY_FORMAT)
            .map_err(|e| RotationError::Validation(format!("无效的 day_key: {raw} ({e})")))?;
        // 回写比对, 拒绝 "2025-6-1" 这类歧义输入
        if parsed.format(DAY_KEY_FORMAT).to_string() != raw {
            return Err(RotationError::Validation(format!(
                "day_key 必须为补零的 YYYY-MM-DD 格式: {raw}"
            )));
        }
        Ok(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frozen(day: (i32, u32, u32)) -> CalendarResolver {
        CalendarResolver::frozen_at(
            9,
            NaiveDate::from_ymd_opt(day.0, day.1, day.2).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_frozen_today() {
        let cal = frozen((2025, 6, 10));
        assert_eq!(cal.today(), NaiveDate::from_ymd_opt(2025, 6, 10).unwrap());
    }

    #[test]
    fn test_resolve_offsets() {
        let cal = frozen((2025, 6, 10));
        assert_eq!(
            cal.resolve(0).unwrap(),
            NaiveDate::from_ymd_opt(2025, 6, 10).unwrap()
        );
        assert_eq!(
            cal.resolve(1).unwrap(),
            NaiveDate::from_ymd_opt(2025, 6, 11).unwrap()
        );
        assert_eq!(
            cal.resolve(-7).unwrap(),
            NaiveDate::from_ymd_opt(2025, 6, 3).unwrap()
        );
    }

    #[test]
    fn test_timezone_shifts_civil_date() {
        // UTC 2025-06-10 20:00 在 UTC+9 已是 6月11日
        let instant = Utc
            .with_ymd_and_hms(2025, 6, 10, 20, 0, 0)
            .unwrap();
        let cal =
            CalendarResolver::with_now_source(9, Arc::new(move || instant)).unwrap();
        assert_eq!(cal.today(), NaiveDate::from_ymd_opt(2025, 6, 11).unwrap());
    }

    #[test]
    fn test_parse_day_key_strict() {
        let cal = frozen((2025, 6, 10));
        assert_eq!(
            cal.parse_day_key("2025-06-01").unwrap(),
            NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
        );
        assert!(cal.parse_day_key("2025-6-1").is_err());
        assert!(cal.parse_day_key("2025/06/01").is_err());
        assert!(cal.parse_day_key("not-a-date").is_err());
        assert!(cal.parse_day_key("2025-02-30").is_err());
    }

    #[test]
    fn test_invalid_offset_rejected() {
        assert!(CalendarResolver::new(30).is_err());
        assert!(CalendarResolver::new(-30).is_err());
    }
}
