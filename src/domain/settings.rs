// ==========================================
// 订单排产系统 - 生产参数领域模型
// ==========================================

use chrono::{Datelike, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

// ==========================================
// SettingsItem - 产品类型配置
// ==========================================
// 每单位生产时长以分钟为单位，订单创建时快照到订单行
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettingsItem {
    pub item_key: String,         // 产品类型标识
    pub item_name: String,        // 产品显示名称
    pub minutes_per_unit: i64,    // 每单位生产时长 (分钟)
}

// ==========================================
// ProductionSettings - 工作日历与产品参数
// ==========================================
// 对齐: production_settings / production_settings_item 表
// 修改参数不影响已存在订单 (订单持有创建时的快照)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductionSettings {
    pub owner_id: String, // 归属用户

    // ===== 产品类型列表 (有序) =====
    pub items: Vec<SettingsItem>,

    // ===== 工作日历 =====
    pub working_hours_per_day: f64, // 每日工时 (展示用，推算以 start/end 为准)
    pub start_time: String,         // 每日开工时刻 "HH:MM"
    pub end_time: String,           // 每日收工时刻 "HH:MM"
    pub working_days: Vec<u32>,     // 工作日集合 (0=周日 .. 6=周六)

    pub updated_at: chrono::NaiveDateTime,
}

impl ProductionSettings {
    /// 创建默认生产参数
    ///
    /// # 参数
    /// - `owner_id`: 归属用户
    ///
    /// # 返回
    /// 默认参数: 产品1=10分钟/件, 产品2=15分钟/件, 8小时/天, 09:00-17:00, 周一至周五
    pub fn default_for(owner_id: &str) -> Self {
        Self {
            owner_id: owner_id.to_string(),
            items: vec![
                SettingsItem {
                    item_key: "item-1".to_string(),
                    item_name: "Item 1".to_string(),
                    minutes_per_unit: 10,
                },
                SettingsItem {
                    item_key: "item-2".to_string(),
                    item_name: "Item 2".to_string(),
                    minutes_per_unit: 15,
                },
            ],
            working_hours_per_day: 8.0,
            start_time: "09:00".to_string(),
            end_time: "17:00".to_string(),
            working_days: vec![1, 2, 3, 4, 5],
            updated_at: chrono::Local::now().naive_local(),
        }
    }

    /// 按产品标识查找配置项
    pub fn find_item(&self, item_key: &str) -> Option<&SettingsItem> {
        self.items.iter().find(|i| i.item_key == item_key)
    }

    /// 解析每日工作时间窗
    ///
    /// # 返回
    /// - `Some((start, end))`: 解析成功且 start < end
    /// - `None`: 时刻格式非法或窗口为空
    pub fn working_window(&self) -> Option<(NaiveTime, NaiveTime)> {
        let start = NaiveTime::parse_from_str(&self.start_time, "%H:%M").ok()?;
        let end = NaiveTime::parse_from_str(&self.end_time, "%H:%M").ok()?;
        if start >= end {
            return None;
        }
        Some((start, end))
    }

    /// 判断某日期是否为工作日
    ///
    /// # 参数
    /// - `date`: 待判断日期
    ///
    /// # 返回
    /// - `true`: 该日期的星期序号 (0=周日..6=周六) 在工作日集合中
    pub fn is_working_day(&self, date: NaiveDate) -> bool {
        self.working_days
            .contains(&date.weekday().num_days_from_sunday())
    }

    /// 校验参数完整性
    ///
    /// # 返回
    /// - `Ok(())`: 参数合法
    /// - `Err(String)`: 首个违规项说明
    pub fn validate(&self) -> Result<(), String> {
        if self.items.is_empty() {
            return Err("产品类型列表不能为空".to_string());
        }
        for item in &self.items {
            if item.item_name.trim().is_empty() {
                return Err(format!("产品 {} 名称不能为空", item.item_key));
            }
            if item.minutes_per_unit <= 0 {
                return Err(format!(
                    "产品 {} 的单位生产时长必须为正数: {}",
                    item.item_key, item.minutes_per_unit
                ));
            }
        }
        {
            let mut seen = std::collections::HashSet::new();
            for item in &self.items {
                if !seen.insert(item.item_key.as_str()) {
                    return Err(format!("产品标识重复: {}", item.item_key));
                }
            }
        }
        if self.working_hours_per_day <= 0.0 {
            return Err(format!(
                "每日工时必须为正数: {}",
                self.working_hours_per_day
            ));
        }
        if self.working_days.is_empty() {
            return Err("工作日集合不能为空".to_string());
        }
        for day in &self.working_days {
            if *day > 6 {
                return Err(format!("工作日序号超出范围 (0-6): {}", day));
            }
        }
        {
            let mut seen = std::collections::HashSet::new();
            for day in &self.working_days {
                if !seen.insert(day) {
                    return Err(format!("工作日序号重复: {}", day));
                }
            }
        }
        if self.working_window().is_none() {
            return Err(format!(
                "工作时间窗非法 (要求 HH:MM 且开工早于收工): {} - {}",
                self.start_time, self.end_time
            ));
        }
        Ok(())
    }
}
