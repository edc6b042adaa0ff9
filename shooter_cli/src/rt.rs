//! Real-time scheduling helpers (Linux SCHED_FIFO / affinity / mlockall).
//!
//! Everything here is best effort: a failed step is logged and the control
//! loop still runs, only with worse jitter.

use crate::cli::RtLock;

#[derive(Debug, Clone, Copy)]
pub struct RtRequest {
    pub prio: Option<i32>,
    pub lock: RtLock,
    pub cpu: Option<usize>,
}

#[cfg(target_os = "linux")]
pub fn setup_rt_once(req: RtRequest) {
    use std::sync::OnceLock;
    static RT_ONCE: OnceLock<()> = OnceLock::new();

    RT_ONCE.get_or_init(|| {
        match apply_mem_lock(req.lock) {
            Ok(()) => tracing::info!(mode = ?req.lock, "RT: memory lock applied"),
            Err(err) => tracing::warn!(%err, "RT: mlockall failed"),
        }
        match apply_fifo_priority(req.prio) {
            Ok(p) => tracing::info!(prio = p, "RT: SCHED_FIFO applied"),
            Err(err) => tracing::warn!(%err, "RT: sched_setscheduler(SCHED_FIFO) failed"),
        }
        match apply_affinity(req.cpu.unwrap_or(0)) {
            Ok(cpu) => tracing::info!(cpu, "RT: pinned to CPU"),
            Err(err) => tracing::warn!(%err, "RT: affinity not applied"),
        }
    });
}

#[cfg(not(target_os = "linux"))]
pub fn setup_rt_once(req: RtRequest) {
    tracing::warn!(?req, "RT mode is only supported on Linux; continuing without it");
}

#[cfg(target_os = "linux")]
fn memlock_limit_hint() -> Option<String> {
    let mut rlim = std::mem::MaybeUninit::<libc::rlimit>::uninit();
    // SAFETY: getrlimit writes a full rlimit on success.
    let rc = unsafe { libc::getrlimit(libc::RLIMIT_MEMLOCK, rlim.as_mut_ptr()) };
    if rc != 0 {
        return None;
    }
    // SAFETY: rc == 0 means the value was initialised.
    let cur = unsafe { rlim.assume_init() }.rlim_cur;
    if cur == libc::RLIM_INFINITY {
        Some("memlock limit: unlimited".to_string())
    } else {
        Some(format!("memlock limit: {} KiB", cur / 1024))
    }
}

#[cfg(target_os = "linux")]
fn mlockall(flags: libc::c_int) -> std::io::Result<()> {
    // SAFETY: plain syscall wrapper with no pointer arguments.
    let rc = unsafe { libc::mlockall(flags) };
    if rc != 0 {
        Err(std::io::Error::last_os_error())
    } else {
        Ok(())
    }
}

#[cfg(target_os = "linux")]
fn apply_mem_lock(lock: RtLock) -> eyre::Result<()> {
    let result = match lock {
        RtLock::None => return Ok(()),
        RtLock::Current => mlockall(libc::MCL_CURRENT),
        RtLock::All => mlockall(libc::MCL_CURRENT | libc::MCL_FUTURE),
    };
    let Err(err) = result else {
        return Ok(());
    };
    let retryable = matches!(err.raw_os_error(), Some(c) if c == libc::EPERM || c == libc::ENOMEM);
    // All -> Current fallback.
    if lock == RtLock::All && retryable && mlockall(libc::MCL_CURRENT).is_ok() {
        tracing::warn!("RT: mlockall(current|future) failed, fell back to current");
        return Ok(());
    }
    let mut msg = format!("mlockall({lock:?}) failed: {err}");
    if retryable {
        if let Some(h) = memlock_limit_hint() {
            msg.push_str(&format!("; {h}"));
        }
        msg.push_str("; hint: needs CAP_IPC_LOCK (or root) and sufficient 'ulimit -l'");
    }
    Err(eyre::eyre!(msg))
}

#[cfg(target_os = "linux")]
fn apply_fifo_priority(prio: Option<i32>) -> eyre::Result<i32> {
    // SAFETY: pure queries.
    let (min, max) = unsafe {
        (
            libc::sched_get_priority_min(libc::SCHED_FIFO),
            libc::sched_get_priority_max(libc::SCHED_FIFO),
        )
    };
    let (min, max) = if min < 0 || max < 0 { (1, 99) } else { (min, max) };
    let value = prio.unwrap_or(max).clamp(min, max);
    let param = libc::sched_param {
        sched_priority: value,
    };
    // SAFETY: `param` outlives the call.
    let rc = unsafe { libc::sched_setscheduler(0, libc::SCHED_FIFO, &param) };
    if rc != 0 {
        let err = std::io::Error::last_os_error();
        // SAFETY: geteuid cannot fail.
        let euid = unsafe { libc::geteuid() };
        eyre::bail!("{err} (euid {euid}); hint: run as root or grant CAP_SYS_NICE");
    }
    Ok(value)
}

#[cfg(target_os = "linux")]
fn apply_affinity(cpu: usize) -> eyre::Result<usize> {
    let max_bits = std::mem::size_of::<libc::cpu_set_t>() * 8;
    if cpu >= max_bits {
        eyre::bail!("requested CPU {cpu} exceeds cpu_set_t capacity {max_bits}");
    }
    // SAFETY: cpu_set_t is plain data; zeroed is a valid empty set.
    let mut allowed: libc::cpu_set_t = unsafe { std::mem::zeroed() };
    // SAFETY: `allowed` is a valid, correctly sized buffer.
    let rc = unsafe {
        libc::sched_getaffinity(0, std::mem::size_of::<libc::cpu_set_t>(), &mut allowed)
    };
    if rc != 0 {
        return Err(eyre::eyre!(std::io::Error::last_os_error()));
    }
    // SAFETY: index checked against capacity above.
    if !unsafe { libc::CPU_ISSET(cpu, &allowed) } {
        eyre::bail!("CPU {cpu} not permitted by current affinity mask");
    }
    // SAFETY: as above.
    let mut desired: libc::cpu_set_t = unsafe { std::mem::zeroed() };
    unsafe {
        libc::CPU_ZERO(&mut desired);
        libc::CPU_SET(cpu, &mut desired);
    }
    // SAFETY: `desired` is a valid, correctly sized set.
    let rc =
        unsafe { libc::sched_setaffinity(0, std::mem::size_of::<libc::cpu_set_t>(), &desired) };
    if rc != 0 {
        return Err(eyre::eyre!(std::io::Error::last_os_error()));
    }
    Ok(cpu)
}
