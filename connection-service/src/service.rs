//! 连接查询服务模块

use std::sync::Arc;

use common::errors::AppResult;
use common::models::connection::ConnectionItem;

use crate::manager::ConnectionManager;

/// 连接注册表的只读视图
pub struct ConnectionService {
    manager: Arc<ConnectionManager>,
}

impl ConnectionService {
    /// 创建新的连接服务实例
    pub fn new(manager: Arc<ConnectionManager>) -> Self {
        Self { manager }
    }

    /// 列出所有连接（按名称排序）
    pub fn list(&self) -> Vec<ConnectionItem> {
        let mut items: Vec<ConnectionItem> = self
            .manager
            .connections()
            .iter()
            .map(|c| c.to_item())
            .collect();
        items.sort_by(|a, b| a.name.cmp(&b.name));
        items
    }

    /// 根据名称获取连接
    pub fn get(&self, name: &str) -> AppResult<ConnectionItem> {
        Ok(self.manager.require(name)?.to_item())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connector::testing::FakeConnector;
    use common::errors::AppError;
    use common::models::connection::ConnectionConfig;

    #[test]
    fn test_list_sorted_by_name() {
        let manager = Arc::new(ConnectionManager::new(Arc::new(FakeConnector::default())));
        for name in ["zeta", "alpha", "mid"] {
            manager
                .create(ConnectionConfig::sqlite(name, format!("{name}.db")))
                .unwrap();
        }
        let service = ConnectionService::new(manager);
        let names: Vec<_> = service.list().into_iter().map(|i| i.name).collect();
        assert_eq!(names, vec!["alpha", "mid", "zeta"]);
        assert!(matches!(service.get("nope"), Err(AppError::ConnectionNotFound(_))));
    }
}
