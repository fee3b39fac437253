use std::fmt;

/// Backend kinds the engine knows about. Only the ones returned by
/// [available_types] are compiled in.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum DeviceType {
    None,
    Cpu,
    Cuda,
    Optix,
    Hip,
    Metal,
    OneApi,
}

const ALL_TYPES: [DeviceType; 6] = [
    DeviceType::Cpu,
    DeviceType::Cuda,
    DeviceType::Optix,
    DeviceType::Hip,
    DeviceType::Metal,
    DeviceType::OneApi,
];

impl DeviceType {
    pub fn name(self) -> &'static str {
        match self {
            DeviceType::None => "NONE",
            DeviceType::Cpu => "CPU",
            DeviceType::Cuda => "CUDA",
            DeviceType::Optix => "OPTIX",
            DeviceType::Hip => "HIP",
            DeviceType::Metal => "METAL",
            DeviceType::OneApi => "ONEAPI",
        }
    }

    /// Case-insensitive lookup, unknown names map to [DeviceType::None].
    pub fn from_name(name: &str) -> DeviceType {
        ALL_TYPES.iter().copied()
            .find(|t| t.name().eq_ignore_ascii_case(name.trim()))
            .unwrap_or(DeviceType::None)
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub device_type: DeviceType,
    pub description: String,
    pub id: String,
    pub num_threads: usize,
    pub display_device: bool,
}

impl DeviceInfo {
    /// The host CPU, using every logical core.
    pub fn cpu() -> DeviceInfo {
        let threads = num_cpus::get();
        DeviceInfo {
            device_type: DeviceType::Cpu,
            description: format!("Host CPU ({} threads)", threads),
            id: "CPU".to_owned(),
            num_threads: threads,
            display_device: false,
        }
    }

    pub fn is_cpu(&self) -> bool {
        self.device_type == DeviceType::Cpu
    }
}

pub fn available_types() -> Vec<DeviceType> {
    vec![DeviceType::Cpu]
}

/// Devices of the given type, or of every compiled-in type when `filter` is `None`.
pub fn available_devices(filter: Option<DeviceType>) -> Vec<DeviceInfo> {
    available_types().into_iter()
        .filter(|&t| filter.map_or(true, |f| f == t))
        .filter_map(|t| match t {
            DeviceType::Cpu => Some(DeviceInfo::cpu()),
            _ => None,
        })
        .collect()
}
