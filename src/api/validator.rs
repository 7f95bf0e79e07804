// ==========================================
// 订单排产系统 - 输入校验器
// ==========================================
// 职责: 订单表单与生产参数的入口校验
// ==========================================

use std::collections::HashMap;

use crate::api::error::{ApiError, ApiResult};
use crate::domain::settings::ProductionSettings;

// ==========================================
// OrderValidator - 订单输入校验器
// ==========================================

/// 订单输入校验器
///
/// 职责：
/// 1. 客户信息校验（姓名、邮箱）
/// 2. 产品数量校验（非负、至少一件、产品类型存在）
/// 3. 生产参数校验（委托领域层规则）
pub struct OrderValidator;

impl OrderValidator {
    /// 创建新的OrderValidator实例
    pub fn new() -> Self {
        Self
    }

    /// 校验客户信息
    ///
    /// # 返回
    /// - Ok(()): 校验通过
    /// - Err(ApiError::InvalidInput): 校验失败
    pub fn validate_customer(&self, name: &str, email: &str) -> ApiResult<()> {
        if name.trim().is_empty() {
            return Err(ApiError::InvalidInput("客户姓名不能为空".to_string()));
        }
        if email.trim().is_empty() {
            return Err(ApiError::InvalidInput("客户邮箱不能为空".to_string()));
        }
        // 轻量格式检查，与表单行为保持一致
        if !email.contains('@') {
            return Err(ApiError::InvalidInput(format!(
                "客户邮箱格式无效: {}",
                email
            )));
        }
        Ok(())
    }

    /// 校验产品数量
    ///
    /// # 参数
    /// - quantities: 产品标识 -> 数量
    /// - settings: 当前生效的生产参数（提供产品目录）
    ///
    /// # 返回
    /// - Ok(()): 校验通过
    /// - Err(ApiError::InvalidInput): 数量为负、产品未知或全部为零
    pub fn validate_quantities(
        &self,
        quantities: &HashMap<String, i64>,
        settings: &ProductionSettings,
    ) -> ApiResult<()> {
        for (item_key, quantity) in quantities {
            if *quantity < 0 {
                return Err(ApiError::InvalidInput(format!(
                    "产品 {} 数量不能为负数: {}",
                    item_key, quantity
                )));
            }
            if settings.find_item(item_key).is_none() {
                return Err(ApiError::InvalidInput(format!(
                    "未知产品类型: {}",
                    item_key
                )));
            }
        }
        if !quantities.values().any(|q| *q > 0) {
            return Err(ApiError::InvalidInput(
                "订单至少需要一件产品".to_string(),
            ));
        }
        Ok(())
    }

    /// 校验生产参数
    pub fn validate_settings(&self, settings: &ProductionSettings) -> ApiResult<()> {
        settings.validate().map_err(ApiError::ValidationError)
    }
}

impl Default for OrderValidator {
    fn default() -> Self {
        Self::new()
    }
}
