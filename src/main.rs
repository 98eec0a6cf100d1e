// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # Flash 消息演示服务器
//!
//! 基于 Tokio 运行时的多线程服务器，用来演示 flash 组件的完整生命周期：
//! - `POST /flash/<severity>`：请求体为 `{"message": "...", "options": {...}}`，写入会话队列
//! - 其它 `GET` 请求：执行渲染前钩子。AJAX 且带 `X-Get-Flash: yes` 时消息进入 `X-Flash` 头，
//!   否则以纯文本列出默认队列中的消息
//! - 会话通过 `WEBFLASH` Cookie 关联，保存在容量受限的 LRU 会话池中
//! - 后台管理控制台（CLI 指令交互）

use log::{debug, error, info, warn};
use serde_derive::Deserialize;
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::{TcpListener, TcpStream},
    runtime::Builder,
    sync::Notify,
};

use std::{
    net::{Ipv4Addr, SocketAddrV4},
    sync::{
        atomic::{AtomicU32, Ordering},
        Arc, Mutex, MutexGuard,
    },
    time::Instant,
};

use webflash::{
    param::{HEADER_FLASH, SESSION_COOKIE},
    Config, Controller, Exception, FlashComponent, FlashContent, FlashOptions, HttpRequestMethod,
    MemorySession, RenderEvent, Request, Response, SessionPool, SharedSession,
};

/// `POST /flash/<severity>` 的请求体
#[derive(Deserialize, Default)]
struct FlashCall {
    message: Option<String>,
    options: Option<FlashOptions>,
}

fn main() {
    // 1. 初始化日志系统：通过外部 YAML 配置级别与输出目的地
    if let Err(e) = log4rs::init_file("config/log4rs.yaml", Default::default()) {
        eprintln!("无法初始化日志系统：{}", e);
    }

    // 2. 环境配置加载
    let config = match Config::from_toml("config/development.toml") {
        Ok(config) => {
            info!("配置文件已载入");
            config
        }
        Err(e) => {
            warn!("{}，使用默认配置", e);
            Config::new()
        }
    };

    // 3. 根据配置文件分配工作线程数
    let runtime = match Builder::new_multi_thread()
        .worker_threads(config.worker_threads().max(1))
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("无法创建Tokio运行时：{}", e);
            return;
        }
    };

    runtime.block_on(serve(config));
}

async fn serve(config: Config) {
    let pool = Arc::new(Mutex::new(SessionPool::from_capacity(
        config.session_capacity(),
    )));
    let flash = Arc::new(FlashComponent::new(config.flash().clone()));

    let port: u16 = config.port();
    let address = match config.local() {
        true => Ipv4Addr::new(127, 0, 0, 1),
        false => Ipv4Addr::new(0, 0, 0, 0),
    };
    let socket = SocketAddrV4::new(address, port);
    let listener = match TcpListener::bind(socket).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("无法绑定端口：{}，错误：{}", port, e);
            return;
        }
    };
    info!("服务端将在{}上监听Socket连接", socket);

    let shutdown = Arc::new(Notify::new());
    let active_connection = Arc::new(AtomicU32::new(0));

    // 后台管理控制台
    tokio::spawn({
        let shutdown = Arc::clone(&shutdown);
        let active_connection = Arc::clone(&active_connection);
        let pool = Arc::clone(&pool);
        async move {
            let mut reader = BufReader::new(tokio::io::stdin());
            let mut input = String::new();
            loop {
                input.clear();
                match reader.read_line(&mut input).await {
                    Ok(0) | Err(_) => break,
                    Ok(_) => {}
                }
                match input.trim() {
                    "stop" => {
                        println!("停机指令已激活，服务器将不再接受新连接...");
                        shutdown.notify_one();
                        break;
                    }
                    "help" => {
                        println!("== Webflash Help ==");
                        println!("stop   - 发出停机信号");
                        println!("status - 查看当前服务器运行状态");
                        println!("help   - 显示此帮助信息");
                        println!("===================");
                    }
                    "status" => {
                        println!("== Webflash 状态 ===");
                        println!("当前活跃连接数: {}", active_connection.load(Ordering::Relaxed));
                        println!("会话池中的会话数: {}", lock_pool(&pool).len());
                        println!("====================");
                    }
                    cmd => println!("无效的命令：{}", cmd),
                }
            }
        }
    });

    let mut id: u128 = 0;

    // 主事件循环 (Accept Loop)
    loop {
        let (mut stream, addr) = tokio::select! {
            _ = shutdown.notified() => {
                info!("主循环接收到停机指令，正在退出...");
                break;
            }
            accepted = listener.accept() => match accepted {
                Ok(accepted) => accepted,
                Err(e) => {
                    warn!("接受连接失败：{}", e);
                    continue;
                }
            },
        };
        debug!("[ID{}]新的连接：{}", id, addr);

        let active_connection = Arc::clone(&active_connection);
        let pool = Arc::clone(&pool);
        let flash = Arc::clone(&flash);
        tokio::spawn(async move {
            active_connection.fetch_add(1, Ordering::Relaxed);
            handle_connection(&mut stream, id, pool, flash).await;
            active_connection.fetch_sub(1, Ordering::Relaxed);
        });
        id += 1;
    }
}

fn lock_pool(pool: &Mutex<SessionPool>) -> MutexGuard<'_, SessionPool> {
    match pool.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// 按 Cookie 找到会话。没有 Cookie 或 Cookie 不在池中时签发新的随机 id，返回值最后一项表示是否为新会话。
fn open_session(
    pool: &Mutex<SessionPool>,
    request: &Request,
    id: u128,
) -> (String, SharedSession, bool) {
    let mut pool = lock_pool(pool);
    if let Some(sid) = request.session_id() {
        if let Some(session) = pool.checkout(sid) {
            return (sid.to_string(), session, false);
        }
        debug!("[ID{}]未知的会话id，重新签发", id);
    }
    let (sid, session) = pool.create();
    (sid, session, true)
}

/// # 连接处理器
///
/// 读取并解析请求，取出会话，执行 flash 逻辑，归还会话并发送响应。
async fn handle_connection(
    stream: &mut TcpStream,
    id: u128,
    pool: Arc<Mutex<SessionPool>>,
    flash: Arc<FlashComponent>,
) {
    let mut buffer = vec![0; 4096];
    if let Err(e) = stream.readable().await {
        error!("[ID{}]等待TCPStream可读时遇到错误: {}", id, e);
        return;
    }
    match stream.try_read(&mut buffer) {
        Ok(0) => return,
        Ok(n) => buffer.truncate(n),
        Err(e) => {
            error!("[ID{}]读取TCPStream时遇到错误: {}", id, e);
            return;
        }
    }

    let start_time = Instant::now();

    let request = match Request::try_from(&buffer, id) {
        Ok(req) => req,
        Err(e) => {
            warn!("[ID{}]解析HTTP请求失败: {}", id, e);
            let response = Response::new().with_status(400).with_body("text/plain", e.to_string());
            let _ = stream.write_all(&response.as_bytes()).await;
            return;
        }
    };

    let (session_id, session, fresh) = open_session(&pool, &request, id);

    // 持有会话锁直到处理结束，同一会话的请求不会交错读写
    let mut response = {
        let mut session = session.lock().await;
        dispatch(&request, &mut session, &flash, id)
    };

    if fresh {
        response = response.with_header(
            "Set-Cookie",
            &format!("{}={}; Path=/; HttpOnly", SESSION_COOKIE, session_id),
        );
    }

    info!(
        "[ID{}] {}, {}, {}, {}, {}, {}ms",
        id,
        request.version(),
        request.method(),
        request.path(),
        response.status_code(),
        request.user_agent(),
        start_time.elapsed().as_millis(),
    );

    let response_bytes = response.as_bytes();
    if let Err(e) = stream.write_all(&response_bytes).await {
        error!("[ID{}]发送响应失败: {}", id, e);
        return;
    }
    let _ = stream.flush().await;
}

fn dispatch(
    request: &Request,
    session: &mut MemorySession,
    flash: &FlashComponent,
    id: u128,
) -> Response {
    if let Some(severity) = request.path().strip_prefix("/flash/") {
        if request.method() != HttpRequestMethod::Post {
            return Response::new().with_status(405);
        }
        return queue_flash(request, session, flash, severity, id);
    }

    match request.method() {
        HttpRequestMethod::Get => {}
        // HEAD 不执行钩子，也不清空队列
        HttpRequestMethod::Head => return Response::new().with_status(200),
        _ => return Response::new().with_status(405),
    }

    let mut controller = Controller::new(request.clone(), session);
    if let Err(e) = flash.before_render(&mut RenderEvent::new(&mut controller)) {
        error!("[ID{}]渲染前钩子失败：{}", id, e);
        return Response::new().with_status(500).with_body("text/plain", e.to_string());
    }
    if controller.response().header(HEADER_FLASH).is_some() {
        debug!("[ID{}]flash消息已写入{}头", id, HEADER_FLASH);
        return controller.into_response();
    }

    let key = flash.config().key.clone();
    let listing: String = flash
        .consume(controller.session_mut(), &key)
        .iter()
        .map(|m| format!("[{}] {}\n", m.kind, m.message))
        .collect();
    controller
        .into_response()
        .with_body("text/plain;charset=utf-8", listing)
}

fn queue_flash(
    request: &Request,
    session: &mut MemorySession,
    flash: &FlashComponent,
    severity: &str,
    id: u128,
) -> Response {
    let call: FlashCall = if request.body().trim().is_empty() {
        FlashCall::default()
    } else {
        match serde_json::from_str(request.body()) {
            Ok(call) => call,
            Err(e) => {
                warn!("[ID{}]无法解析请求体：{}", id, e);
                return Response::new().with_status(400).with_body("text/plain", e.to_string());
            }
        }
    };

    match flash.call(session, severity, call.message.map(FlashContent::from), call.options) {
        Ok(()) => {
            let pending = flash.pending(session, &flash.config().key);
            Response::new()
                .with_status(200)
                .with_body("application/json", format!("{{\"pending\":{}}}", pending))
        }
        Err(e @ Exception::FlashMessageMissing) => {
            Response::new().with_status(400).with_body("text/plain", e.to_string())
        }
        Err(e) => {
            error!("[ID{}]写入flash消息失败：{}", id, e);
            Response::new().with_status(500).with_body("text/plain", e.to_string())
        }
    }
}
