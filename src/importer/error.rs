// ==========================================
// 学员训练计划管理 - 导入模块错误类型
// ==========================================
// 工具: thiserror 派生宏
// ==========================================

use thiserror::Error;

/// 导入模块错误类型
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 文档结构错误 =====
    #[error("文档不是 JSON 对象 ({entity})")]
    NotAnObject { entity: &'static str },

    #[error("必填字段缺失 ({entity}.{field})")]
    MissingField {
        entity: &'static str,
        field: &'static str,
    },

    // ===== 通用错误 =====
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result 类型别名
pub type ImportResult<T> = Result<T, ImportError>;
