use std::collections::HashSet;

use rand::seq::SliceRandom;

use super::gateway::VoiceError;

/// 통화방 이름 풀. 카탈로그가 소진될 때까지 같은 이름을 다시 내주지 않는다.
pub struct NamePool {
    catalog: Vec<String>,
    in_use: HashSet<String>,
}

impl NamePool {
    pub fn new(catalog: Vec<String>) -> Result<Self, VoiceError> {
        if catalog.is_empty() {
            return Err(VoiceError::Config("채널 이름 카탈로그가 비어있습니다".into()));
        }
        Ok(Self {
            catalog,
            in_use: HashSet::new(),
        })
    }

    /// 사용 중이 아닌 이름을 무작위로 하나 내준다.
    /// 전부 사용 중이면 풀을 초기화한 뒤 전체 카탈로그에서 다시 뽑는다.
    pub fn allocate(&mut self) -> String {
        let free: Vec<&String> = self
            .catalog
            .iter()
            .filter(|n| !self.in_use.contains(*n))
            .collect();

        let name = match free.choose(&mut rand::thread_rng()) {
            Some(n) => (*n).clone(),
            None => {
                // 소진: 초기화 후 전체에서 재선택
                self.in_use.clear();
                self.catalog
                    .choose(&mut rand::thread_rng())
                    .cloned()
                    .unwrap_or_else(|| self.catalog[0].clone())
            }
        };

        self.in_use.insert(name.clone());
        name
    }

    /// 이름 반납. 사용 중이 아니었어도 무시한다.
    pub fn release(&mut self, name: &str) {
        self.in_use.remove(name);
    }

    pub fn in_use_count(&self) -> usize {
        self.in_use.len()
    }
}
