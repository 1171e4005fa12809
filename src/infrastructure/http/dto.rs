//! Wire shapes of the notification backend.
//!
//! The backend speaks Portuguese field names; everything is mapped onto the
//! crate's models at this boundary.

use crate::models::{NotificationCounts, NotificationList, NotificationRecord};
use serde::Deserialize;

/// `{ nao_lidas, total_notificacoes }`; an empty object means no notifications
#[derive(Debug, Default, Deserialize)]
pub struct CountsDto {
    #[serde(default)]
    pub nao_lidas: Option<u64>,
    #[serde(default)]
    pub total_notificacoes: Option<u64>,
}

impl From<CountsDto> for NotificationCounts {
    fn from(dto: CountsDto) -> Self {
        NotificationCounts::new(
            dto.nao_lidas.unwrap_or(0),
            dto.total_notificacoes.unwrap_or(0),
        )
    }
}

#[derive(Debug, Deserialize)]
pub struct NotificationDto {
    pub id: i64,
    pub titulo: String,
    #[serde(default)]
    pub mensagem: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    pub data: String,
    #[serde(default)]
    pub lido: bool,
}

impl From<NotificationDto> for NotificationRecord {
    fn from(dto: NotificationDto) -> Self {
        Self {
            id: dto.id,
            title: dto.titulo,
            message: dto.mensagem.unwrap_or_default(),
            link: dto.link.filter(|link| !link.trim().is_empty()),
            created_at: dto.data,
            read: dto.lido,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct NotificationListDto {
    pub dados: Vec<NotificationDto>,
    #[serde(default)]
    pub pagina_atual: Option<u32>,
    #[serde(default)]
    pub total_paginas: Option<u32>,
    #[serde(default)]
    pub nao_lidas: Option<u64>,
    #[serde(default)]
    pub total_notificacoes: Option<u64>,
}

impl NotificationListDto {
    /// Convert, falling back to the requested page when the server omits it
    pub fn into_list(self, requested_page: u32) -> NotificationList {
        let page = self.pagina_atual.unwrap_or(requested_page);
        let total_pages = self
            .total_paginas
            .unwrap_or(if self.dados.is_empty() { 0 } else { page });

        NotificationList {
            records: self.dados.into_iter().map(NotificationRecord::from).collect(),
            page,
            total_pages,
            counts: NotificationCounts::new(
                self.nao_lidas.unwrap_or(0),
                self.total_notificacoes.unwrap_or(0),
            ),
        }
    }
}
